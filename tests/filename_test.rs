use chrono::{TimeZone, Utc};

use readclip::extractor::Article;
use readclip::filename::{synthesize, synthesize_at};

fn article(title: &str, site_name: &str) -> Article {
    Article {
        title: title.into(),
        site_name: site_name.into(),
        ..Article::default()
    }
}

#[test]
fn joins_title_site_and_timestamp() {
    let at = Utc.with_ymd_and_hms(2024, 5, 17, 9, 3, 7).unwrap();
    assert_eq!(
        synthesize_at(&article("Rust 2024: what's new?", "The Blog"), at),
        "Rust_2024_what_s_new_The_Blog_2024-05-17T09-03-07.pdf"
    );
}

#[test]
fn empty_parts_are_skipped() {
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(synthesize_at(&article("", ""), at), "2024-01-02T03-04-05.pdf");
    assert_eq!(synthesize_at(&article("!!!", "Site"), at), "Site_2024-01-02T03-04-05.pdf");
}

#[test]
fn long_parts_are_capped() {
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let name = synthesize_at(&article(&"t".repeat(200), &"s".repeat(50)), at);
    let expected = format!("{}_{}_2024-01-02T03-04-05.pdf", "t".repeat(80), "s".repeat(30));
    assert_eq!(name, expected);
}

#[test]
fn cjk_titles_survive() {
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(
        synthesize_at(&article("日本語のニュース", ""), at),
        "日本語のニュース_2024-01-02T03-04-05.pdf"
    );
}

#[test]
fn current_time_names_are_well_formed() {
    let name = synthesize(&article("Hello", "World"));
    assert!(name.starts_with("Hello_World_"));
    assert!(name.ends_with(".pdf"));
    assert!(!name.contains(':'));
}
