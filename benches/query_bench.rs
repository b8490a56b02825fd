use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use tvquery::lexer::Lexer;
use tvquery::parser::Parser;
use tvquery::{
    to_requests, Aggregation, DateRange, Keywords, ParseMode, QueryCompiler, Vocabulary,
    VocabularyConfig,
};

const CASES: [(&str, &str); 4] = [
    ("simple", "channel=CNN"),
    ("medium", r#"[fox climate] channel=FOX AND text="climate change" AND face_count=2"#),
    (
        "complex",
        r#"(show=hannity OR show="Tucker Carlson Tonight") AND (face_name=donald trump OR face_name=hillary clinton) AND text_window=30 NORMALIZE channel=FOXNEWS"#,
    ),
    (
        "redundant",
        "text=a AND (text=b AND (text=c AND (text=a AND (text=b AND text=d))))",
    ),
];

// 创建带有节目和人物的词表
fn create_vocabulary() -> Vocabulary {
    Vocabulary::from_config(&VocabularyConfig {
        shows: vec!["Hannity".to_string(), "Tucker Carlson Tonight".to_string()],
        people: vec!["Donald Trump".to_string(), "Hillary Clinton".to_string()],
        ..Default::default()
    })
}

// 基准测试：词法分析性能
fn benchmark_lexer(c: &mut Criterion) {
    let keywords = Keywords::default();
    let mut group = c.benchmark_group("lexer_performance");

    for (name, source) in CASES {
        group.bench_with_input(BenchmarkId::new("tokenize", name), &source, |b, &source| {
            b.iter(|| {
                let tokens: Vec<_> = Lexer::new(black_box(source), &keywords).collect();
                black_box(tokens)
            })
        });
    }

    group.finish();
}

// 基准测试：语法分析性能
fn benchmark_parser(c: &mut Criterion) {
    let keywords = Keywords::default();
    let mut group = c.benchmark_group("parser_performance");

    for (name, source) in CASES {
        // 预先词法分析
        let tokens: Vec<_> = Lexer::new(source, &keywords).collect();

        group.bench_with_input(BenchmarkId::new("parse", name), &tokens, |b, tokens| {
            b.iter(|| {
                let mut parser = Parser::new(source, black_box(tokens));
                match parser.parse() {
                    Ok(raw) => black_box(raw),
                    Err(e) => panic!("parse failed: {}", e),
                }
            })
        });
    }

    group.finish();
}

// 基准测试：完整的构建流程（分析、校验、优化）
fn benchmark_build(c: &mut Criterion) {
    let vocabulary = create_vocabulary();
    let compiler = QueryCompiler::new(&vocabulary);
    let mut group = c.benchmark_group("build_performance");

    for (name, source) in CASES {
        group.bench_with_input(BenchmarkId::new("build", name), &source, |b, &source| {
            b.iter(|| {
                let query = compiler
                    .build(black_box(source), ParseMode::Strict)
                    .expect("query should build");
                black_box(query)
            })
        });
    }

    group.finish();
}

// 基准测试：请求生成
fn benchmark_requests(c: &mut Criterion) {
    let vocabulary = create_vocabulary();
    let compiler = QueryCompiler::new(&vocabulary);
    let range = DateRange::new(
        NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(),
    )
    .unwrap();
    let mut group = c.benchmark_group("request_performance");

    for (name, source) in CASES {
        // 预处理：构建查询
        let query = compiler.build(source, ParseMode::Strict).expect("query should build");

        group.bench_with_input(BenchmarkId::new("to_requests", name), &query, |b, query| {
            b.iter(|| {
                let strings: Vec<String> = to_requests(black_box(query), range, Aggregation::Month)
                    .iter()
                    .map(|r| r.query_string())
                    .collect();
                black_box(strings)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_lexer,
    benchmark_parser,
    benchmark_build,
    benchmark_requests
);
criterion_main!(benches);
