use criterion::{Criterion, criterion_group, criterion_main};
use help_desk::classifier::parse_classification;
use help_desk::knowledge::ingest::{KNOWLEDGE_BASE_SOURCE, markdown_records};
use std::fmt::Write as _;
use std::hint::black_box;

const HEADINGS: [&str; 8] = [
    "Password Reset Procedures",
    "Software Installation",
    "Hardware Failures",
    "Network Troubleshooting",
    "Email Configuration",
    "Security Incidents",
    "Acceptable Use Policy",
    "Office Hours",
];

fn synthetic_knowledge_base(sections: usize, bullets: usize) -> String {
    let mut content = String::from("# IT Knowledge Base\n\nGeneral introduction.\n\n");
    for section in 0..sections {
        let _ = writeln!(content, "## {} {}", HEADINGS[section % HEADINGS.len()], section);
        for bullet in 0..bullets {
            let _ = writeln!(
                content,
                "- Step {} for section {}: follow the documented procedure and contact support if needed",
                bullet, section
            );
        }
        content.push('\n');
    }
    content
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let content = synthetic_knowledge_base(200, 12);
    c.bench_function("markdown_records", |b| {
        b.iter(|| markdown_records(black_box(&content), black_box(KNOWLEDGE_BASE_SOURCE)))
    });

    let reply = r#"Here is my analysis of the request.
{"category": "network_connectivity", "confidence": 0.87, "reasoning": "The user mentions {wifi} drops", "escalate": false, "escalation_reason": null}
Hope this helps!"#;
    c.bench_function("parse_classification", |b| {
        b.iter(|| parse_classification(black_box(reply)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
