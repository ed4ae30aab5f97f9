use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, warn};
use crate::core::db::{split_statements, Database, ErrorDisplayMode, StorageType};
use crate::core::error::DbError;
use crate::core::sql::{ExecutionResult, OutputFormat, TableFormatter};
use crate::core::storage::StorageOptions;

/// 在分隔符文本文件组成的目录上执行 SQL
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 存放表文件的目录，每个文件是一张表
    pub folder: PathBuf,

    /// 要执行的SQL语句（可用分号分隔多条），省略时进入交互模式
    pub query: Option<String>,

    /// 查询结果的输出格式
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// 表文件的字段分隔符
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// 表文件的扩展名
    #[arg(long, default_value = "csv")]
    pub extension: String,

    /// 显示详细错误信息
    #[arg(long)]
    pub detailed_errors: bool,

    /// 日志详细程度，可重复（-v, -vv, -vvv）
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// 默认日志级别，RUST_LOG 未设置时使用
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    fn open_database(&self) -> Database {
        let options = StorageOptions {
            delimiter: self.delimiter,
            extension: self.extension.clone(),
        };
        let mut db = Database::new(StorageType::File(self.folder.clone(), options));
        if self.detailed_errors {
            db.set_error_mode(ErrorDisplayMode::Detailed);
        }
        db
    }

    /// 运行命令行：有查询时执行后退出，否则进入交互模式
    ///
    /// 返回 `Ok(false)` 表示有语句执行失败（错误信息已输出）
    pub fn run(&self) -> Result<bool, DbError> {
        let mut db = self.open_database();
        match &self.query {
            Some(query) => self.run_once(&mut db, query),
            None => {
                let stdin = std::io::stdin();
                self.run_repl(&mut db, stdin.lock(), &mut std::io::stdout())?;
                Ok(true)
            }
        }
    }

    fn run_once(&self, db: &mut Database, query: &str) -> Result<bool, DbError> {
        let mut stdout = std::io::stdout();
        match db.execute_batch(query) {
            Ok(results) => {
                for result in &results {
                    self.print_result(result, &mut stdout, false)?;
                }
                Ok(true)
            }
            Err(e) => {
                eprintln!("{}", db.format_error(&e));
                Ok(false)
            }
        }
    }

    fn print_result(&self, result: &ExecutionResult, out: &mut impl Write, interactive: bool) -> Result<(), DbError> {
        match result {
            ExecutionResult::Select(table) => {
                for line in TableFormatter::render(table, self.format, self.delimiter)? {
                    writeln!(out, "{}", line)?;
                }
            }
            ExecutionResult::Affected(count) => {
                if interactive {
                    writeln!(out, "{} 行受影响", count)?;
                }
            }
        }
        Ok(())
    }

    /// 交互模式：SQL语句以分号结束，可以跨多行输入
    pub fn run_repl(&self, db: &mut Database, input: impl BufRead, out: &mut impl Write) -> Result<(), DbError> {
        writeln!(out, "flat_sql - 在 {} 上执行SQL", self.folder.display())?;
        writeln!(out, "输入 'help' 获取帮助信息, 'exit' 退出程序")?;

        // 用于缓存多行SQL语句
        let mut sql_buffer = String::new();
        let mut lines = input.lines();

        loop {
            // 根据是否在继续输入SQL语句显示不同的提示符
            write!(out, "{}", if sql_buffer.is_empty() { "> " } else { "-> " })?;
            out.flush()?;

            let line = match lines.next() {
                Some(line) => line?,
                None => break,
            };
            let trimmed = line.trim();

            // clear 随时生效，其余特殊命令只在没有未完成的语句时生效，都不需要分号
            if trimmed == "clear" {
                sql_buffer.clear();
                writeln!(out, "已清除当前SQL缓冲区")?;
                continue;
            }
            if sql_buffer.is_empty() {
                match trimmed {
                    "" => continue,
                    "exit" => break,
                    "help" => {
                        print_help(out)?;
                        continue;
                    }
                    "list" => {
                        match db.list_tables() {
                            Ok(tables) if tables.is_empty() => writeln!(out, "没有表")?,
                            Ok(tables) => {
                                writeln!(out, "表列表:")?;
                                for table in tables {
                                    writeln!(out, "  {}", table)?;
                                }
                            }
                            Err(e) => writeln!(out, "{}", db.format_error(&e))?,
                        }
                        continue;
                    }
                    _ => {}
                }
            }

            sql_buffer.push_str(&line);
            sql_buffer.push('\n');

            // 最后一个分号之后的部分留在缓冲区中继续输入
            let complete = match last_terminator(&sql_buffer) {
                Some(end) => {
                    let rest = sql_buffer.split_off(end + 1);
                    std::mem::replace(&mut sql_buffer, rest)
                }
                None => continue,
            };
            if split_statements(&sql_buffer).is_empty() {
                sql_buffer.clear();
            }

            for statement in split_statements(&complete) {
                debug!(sql = %statement, "执行语句");
                match db.execute_sql(&statement) {
                    Ok(result) => self.print_result(&result, out, true)?,
                    Err(e) => {
                        warn!(error = %e, "语句执行失败");
                        writeln!(out, "{}", db.format_error(&e))?;
                    }
                }
            }
        }

        Ok(())
    }
}

fn print_help(out: &mut impl Write) -> Result<(), DbError> {
    writeln!(out, "可用命令:")?;
    writeln!(out, "  help  - 显示帮助信息")?;
    writeln!(out, "  exit  - 退出程序")?;
    writeln!(out, "  list  - 列出所有表")?;
    writeln!(out, "  clear - 清除当前SQL缓冲区")?;
    writeln!(out, "SQL命令: (以分号结束)")?;
    writeln!(out, "  -- 这是SQL注释")?;
    writeln!(out, "  INSERT INTO table_name [(column, ...)] VALUES (value, ...);")?;
    writeln!(out, "  UPDATE table_name SET column = value, ... [WHERE condition];")?;
    writeln!(out, "  DELETE FROM table_name [WHERE condition];")?;
    writeln!(out, "  SELECT * | column, ... FROM table_name [WHERE condition] [ORDER BY column [ASC|DESC], ...];")?;
    Ok(())
}

// 引号和注释之外最后一个分号的位置
fn last_terminator(text: &str) -> Option<usize> {
    let mut last = None;
    let mut in_string = false;
    let mut in_comment = false;
    let mut previous = '\0';
    for (i, c) in text.char_indices() {
        if in_comment {
            in_comment = c != '\n';
        } else if c == '\'' {
            in_string = !in_string;
        } else if !in_string && c == '-' && previous == '-' {
            in_comment = true;
        } else if !in_string && c == ';' {
            last = Some(i);
        }
        previous = c;
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn cli(folder: PathBuf) -> Cli {
        Cli::parse_from(["flat_sql", folder.to_str().unwrap()])
    }

    fn repl(cli: &Cli, input: &str) -> String {
        let mut db = cli.open_database();
        let mut out = Vec::new();
        cli.run_repl(&mut db, input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::parse_from([
            "flat_sql", "data", "SELECT * FROM t", "--format", "json", "--delimiter", ";",
            "--extension", "txt", "--detailed-errors", "-vv",
        ]);
        assert_eq!(cli.folder, PathBuf::from("data"));
        assert_eq!(cli.query.as_deref(), Some("SELECT * FROM t"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.delimiter, ';');
        assert_eq!(cli.extension, "txt");
        assert!(cli.detailed_errors);
        assert_eq!(cli.log_level(), "debug");

        let defaults = Cli::parse_from(["flat_sql", "data"]);
        assert_eq!(defaults.query, None);
        assert_eq!(defaults.format, OutputFormat::Csv);
        assert_eq!(defaults.delimiter, ',');
        assert_eq!(defaults.log_level(), "warn");
    }

    #[test]
    fn test_repl_multiline_statement() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("t.csv"), "id,name\n1,a\n2,b\n").unwrap();
        let output = repl(&cli(dir.path().to_path_buf()), "SELECT name\nFROM t\nWHERE id = 2;\nexit\n");
        assert!(output.contains("-> "));
        assert!(output.lines().any(|line| line.ends_with("b")));
        assert!(!output.lines().any(|line| line.ends_with("a")));
    }

    #[test]
    fn test_repl_reports_errors_and_continues() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("t.csv"), "id\n1\n").unwrap();
        let output = repl(
            &cli(dir.path().to_path_buf()),
            "SELECT * FROM missing;\nDELETE FROM t WHERE id = 1;\n",
        );
        assert!(output.contains("Error: Invalid table"));
        assert!(output.contains("1 行受影响"));
        assert_eq!(fs::read_to_string(dir.path().join("t.csv")).unwrap(), "id\n");
    }

    #[test]
    fn test_repl_commands() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("people.csv"), "id\n1\n").unwrap();
        let output = repl(&cli(dir.path().to_path_buf()), "list\nDELETE FROM people\nclear\nhelp\nexit\n");
        assert!(output.contains("  people"));
        assert!(output.contains("已清除当前SQL缓冲区"));
        assert!(output.contains("可用命令"));
        // 清除后语句没有执行
        assert_eq!(fs::read_to_string(dir.path().join("people.csv")).unwrap(), "id\n1\n");
    }

    #[test]
    fn test_repl_clear_on_empty_buffer() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("t.csv"), "id\n1\n2\n").unwrap();
        let output = repl(&cli(dir.path().to_path_buf()), "clear\nDELETE FROM t WHERE id = 1;\n");
        assert!(output.contains("已清除当前SQL缓冲区"));
        assert!(output.contains("1 行受影响"));
        assert!(!output.contains("Error"));
        assert_eq!(fs::read_to_string(dir.path().join("t.csv")).unwrap(), "id\n2\n");
    }

    #[test]
    fn test_last_terminator_skips_quotes_and_comments() {
        assert_eq!(last_terminator("SELECT * FROM t; x"), Some(15));
        assert_eq!(last_terminator("a = ';' -- ;\n"), None);
        assert_eq!(last_terminator("no terminator"), None);
    }
}
