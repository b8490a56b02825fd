use anyhow::Context;
use chrono::NaiveDate;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tvquery::optimizer::optimize_traced;
use tvquery::parser::parse;
use tvquery::validator::Validator;
use tvquery::{
    to_requests, Aggregation, DateRange, ParseMode, Query, QueryCompiler, Vocabulary,
    VocabularyConfig,
};

const CONFIG_FILE: &str = "vocabulary.json";

/// 加载词表配置，优先使用JSON配置，失败时只使用内置频道
fn load_config() -> VocabularyConfig {
    match VocabularyConfig::from_json_file(CONFIG_FILE) {
        Ok(config) => {
            println!(
                "loaded {}: {} shows, {} people, {} tags",
                CONFIG_FILE,
                config.shows.len(),
                config.people.len(),
                config.tags.len()
            );
            config
        }
        Err(e) => {
            println!("{}; using built-in channels only", e);
            VocabularyConfig::default()
        }
    }
}

struct Session {
    mode: ParseMode,
    range: DateRange,
    aggregation: Aggregation,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tvquery=info")),
        )
        .init();

    info!("tvquery {}", env!("CARGO_PKG_VERSION"));

    let config = load_config();
    let vocabulary = Vocabulary::from_config(&config);
    let compiler = QueryCompiler::with_keywords(&vocabulary, config.keywords.clone());

    // 默认日期范围与聚合粒度
    let default_range = DateRange::new(
        NaiveDate::from_ymd_opt(2010, 1, 1).context("invalid default start date")?,
        NaiveDate::from_ymd_opt(2019, 12, 31).context("invalid default end date")?,
    )?;
    let mut session = Session {
        mode: ParseMode::Strict,
        range: default_range,
        aggregation: Aggregation::Month,
    };

    println!("type a query, or :help");
    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("tvquery> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;
                // `:` 开头的是命令，其余按查询处理
                if let Some(command) = line.strip_prefix(':') {
                    if !run_command(command, &mut session) {
                        break;
                    }
                } else {
                    run_query(&compiler, line, &session);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// 处理 `:` 开头的命令，返回 false 表示结束会话
fn run_command(command: &str, session: &mut Session) -> bool {
    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("quit") | Some("q"), _, _) => return false,
        (Some("strict"), _, _) => {
            session.mode = ParseMode::Strict;
            println!("strict mode");
        }
        (Some("lenient"), _, _) => {
            session.mode = ParseMode::Lenient;
            println!("lenient mode");
        }
        (Some("agg"), Some(name), _) => match name.parse::<Aggregation>() {
            Ok(aggregation) => session.aggregation = aggregation,
            Err(e) => println!("{}", e),
        },
        (Some("range"), Some(start), Some(end)) => match parse_range(start, end) {
            Ok(range) => session.range = range,
            Err(e) => println!("{:#}", e),
        },
        _ => {
            println!(":strict | :lenient | :agg day|week|month|year | :range START END | :quit")
        }
    }
    true
}

fn parse_range(start: &str, end: &str) -> anyhow::Result<DateRange> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid start date \"{}\"", start))?;
    let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
        .with_context(|| format!("invalid end date \"{}\"", end))?;
    Ok(DateRange::new(start, end)?)
}

fn run_query(compiler: &QueryCompiler<'_>, line: &str, session: &Session) {
    let query = match compiler.build(line, session.mode) {
        Ok(query) => query,
        Err(e) => {
            println!("error: {}", e);
            for problem in compiler.check(line).iter().skip(1) {
                println!("       {}", problem);
            }
            return;
        }
    };

    // 1. 查询本身：名称、主查询树、次查询树
    print_query(&query);
    // 2. 优化器改写
    print_rewrites(compiler, line);
    // 3. 发往后端的请求
    for request in to_requests(&query, session.range, session.aggregation) {
        println!("  {:<9} ?{}", request.purpose, request.query_string());
    }
}

fn print_query(query: &Query) {
    println!("  name      {}", query.display_name());
    match query.main() {
        Some(tree) => println!("  main      {}", tree.to_wire()),
        None => println!("  main      (everything)"),
    }
    if let Some(secondary) = query.secondary() {
        let tree = secondary
            .tree()
            .map(|t| t.to_wire())
            .unwrap_or_else(|| "(everything)".to_string());
        println!("  {:<9} {}", secondary.kind().as_str(), tree);
    }
}

/// 显示优化器对主查询树所做的改写
fn print_rewrites(compiler: &QueryCompiler<'_>, line: &str) {
    let Ok(raw) = parse(line, compiler.keywords()) else {
        return;
    };
    let Some(main) = raw.main else {
        return;
    };
    let vocabulary = compiler.vocabulary();
    let validator = Validator::new(vocabulary, compiler.keywords());
    if let Ok(tree) = validator.validate(&main) {
        for rewrite in optimize_traced(tree).rewrites {
            println!("  rewrite   {:?}", rewrite);
        }
    }
}
