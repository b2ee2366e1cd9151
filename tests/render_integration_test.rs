use anyhow::Result;
use funding_treemap::config::toml_config::RenderConfig;
use funding_treemap::core::fonts::FontSet;
use funding_treemap::core::hierarchy::{build_hierarchy, sort_by_value, sum};
use funding_treemap::core::loader::DataLoader;
use funding_treemap::core::prepare::{
    aggregate_by_department, write_totals_csv, FundingListingParser,
};
use funding_treemap::core::treemap::TreemapLayout;
use funding_treemap::core::{LayoutEngine, TreemapOptions};
use funding_treemap::utils::error::ErrorSeverity;
use funding_treemap::{LocalStorage, RenderEngine, RenderError};
use httpmock::prelude::*;
use tempfile::TempDir;

const FUNDING_CSV: &str = "department,funding\nA,100\nB,\n";
const WORDS_JSON: &str = r#"{"A": {"science": 10, "data": 5}}"#;
const FIXTURE_FONT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/Tuffy.ttf");

fn local_config(dir: &TempDir) -> RenderConfig {
    let mut config = RenderConfig::default();
    config.source.funding = dir.path().join("funding.csv").to_string_lossy().into_owned();
    config.source.words = dir.path().join("words.json").to_string_lossy().into_owned();
    config.output.path = "out".to_string();
    config.export.system_fonts = false;
    config
}

fn write_sources(dir: &TempDir) -> Result<()> {
    std::fs::write(dir.path().join("funding.csv"), FUNDING_CSV)?;
    std::fs::write(dir.path().join("words.json"), WORDS_JSON)?;
    Ok(())
}

#[tokio::test]
async fn test_remote_sources_render() -> Result<()> {
    let server = MockServer::start();
    let funding_mock = server.mock(|when, then| {
        when.method(GET).path("/departments_funding.csv");
        then.status(200)
            .header("Content-Type", "text/csv")
            .body(FUNDING_CSV);
    });
    let words_mock = server.mock(|when, then| {
        when.method(GET).path("/word_counts_by_department.json");
        then.status(200)
            .header("Content-Type", "application/json")
            .body(WORDS_JSON);
    });

    let toml_content = format!(
        r#"
[source]
funding = "{}/departments_funding.csv"
words = "{}/word_counts_by_department.json"

[output]
path = "out"

[export]
system_fonts = false
"#,
        server.base_url(),
        server.base_url()
    );
    let config = RenderConfig::from_toml_str(&toml_content)?;
    config.validate_config()?;

    let temp_dir = TempDir::new()?;
    let storage = LocalStorage::new(temp_dir.path());
    let engine = RenderEngine::with_fonts(storage, config, FontSet::default());
    let (ctx, report) = engine.render().await?;

    funding_mock.assert();
    words_mock.assert();
    assert_eq!(report.departments, 2);
    assert_eq!(report.total_funding, 101.0);
    assert_eq!(report.clouds_drawn, 1);
    assert!(report.words_placed >= 1 && report.words_placed <= 2);

    // 同一格的字都用同一色
    let svg = ctx.scene().to_svg();
    let word_fills = svg.matches("class=\"treemap-text\"").count();
    assert_eq!(svg.matches("fill: #8dd3c7;").count(), word_fills);
    Ok(())
}

#[tokio::test]
async fn test_remote_failure_is_terminal() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/departments_funding.csv");
        then.status(200).body(FUNDING_CSV);
    });
    server.mock(|when, then| {
        when.method(GET).path("/word_counts_by_department.json");
        then.status(404);
    });

    let mut config = RenderConfig::default();
    config.source.funding = server.url("/departments_funding.csv");
    config.source.words = server.url("/word_counts_by_department.json");
    config.export.system_fonts = false;

    let temp_dir = TempDir::new()?;
    let storage = LocalStorage::new(temp_dir.path());
    let engine = RenderEngine::with_fonts(storage, config, FontSet::default());
    let result = engine.render().await;

    match result {
        Err(e @ RenderError::ResourceError { .. }) => {
            assert_eq!(e.severity(), ErrorSeverity::Medium);
            assert!(e.to_string().contains("404"));
        }
        other => panic!("expected ResourceError, got {:?}", other.map(|(_, r)| r)),
    }
    Ok(())
}

#[tokio::test]
async fn test_local_render_writes_svg() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_sources(&temp_dir)?;

    let mut config = local_config(&temp_dir);
    config.output.save_svg = true;
    let storage = LocalStorage::new(temp_dir.path());
    let engine = RenderEngine::with_fonts(storage, config, FontSet::default());
    let report = engine.run(false).await?;

    let svg_path = temp_dir.path().join("out").join("treemap.svg");
    assert!(svg_path.exists());
    assert_eq!(report.svg_path, Some(svg_path.to_string_lossy().into_owned()));
    assert!(report.png_path.is_none());

    let svg = std::fs::read_to_string(&svg_path)?;
    assert!(svg.contains("width=\"820\" height=\"1120\""));
    assert_eq!(svg.matches("class=\"treemap-block\"").count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_missing_funding_gets_minimal_area() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_sources(&temp_dir)?;
    let config = local_config(&temp_dir);

    let loader = DataLoader::new(LocalStorage::new(temp_dir.path()));
    let data = loader.load(&config.source.funding, &config.source.words).await?;

    let mut root = build_hierarchy(&data.records);
    assert_eq!(sum(&mut root), 101.0);
    sort_by_value(&mut root);

    let options = TreemapOptions {
        width: 600.0,
        height: 900.0,
        padding_outer: 5.0,
        padding_inner: 0.0,
    };
    let cells = TreemapLayout::default().layout(&root, &options)?;
    let total: f64 = cells.iter().map(|c| c.area()).sum();

    assert_eq!(cells[0].department, "A");
    assert!((cells[0].area() / total - 100.0 / 101.0).abs() < 1e-9);
    assert!((cells[1].area() / total - 1.0 / 101.0).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_sliver_cell_does_not_stall_render() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(
        temp_dir.path().join("funding.csv"),
        "department,funding\nA,1000000000\nB,\n",
    )?;
    std::fs::write(
        temp_dir.path().join("words.json"),
        r#"{"A": {"science": 10}, "B": {"science": 10, "data": 5}}"#,
    )?;

    let engine = RenderEngine::with_fonts(
        LocalStorage::new(temp_dir.path()),
        local_config(&temp_dir),
        FontSet::default(),
    );
    let (_, report) =
        tokio::time::timeout(std::time::Duration::from_secs(30), engine.render()).await??;

    assert_eq!(report.departments, 2);
    // B 的格子只有一條細線，字全部放棄
    assert_eq!(report.words_placed, 1);
    Ok(())
}

#[tokio::test]
async fn test_export_without_font_leaves_no_png() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_sources(&temp_dir)?;

    let engine = RenderEngine::with_fonts(
        LocalStorage::new(temp_dir.path()),
        local_config(&temp_dir),
        FontSet::default(),
    );
    let (ctx, _) = engine.render().await?;
    let result = engine.export(&ctx).await;

    match result {
        Err(e @ RenderError::FontNotFound { .. }) => {
            assert_eq!(e.severity(), ErrorSeverity::High);
            assert!(e.user_friendly_message().contains("DM Sans"));
        }
        other => panic!("expected FontNotFound, got {:?}", other),
    }
    assert!(!temp_dir.path().join("out").join("treemap.png").exists());
    assert_eq!(ctx.blobs().live_handles(), 0);
    Ok(())
}

#[tokio::test]
async fn test_export_png_matches_scene_size() -> Result<()> {
    let fonts = FontSet::load(false, &[FIXTURE_FONT.to_string()]);
    assert_eq!(fonts.families(), ["Tuffy"]);

    let temp_dir = TempDir::new()?;
    write_sources(&temp_dir)?;
    let mut config = local_config(&temp_dir);
    config.export.font_family = "Tuffy".to_string();

    let engine = RenderEngine::with_fonts(LocalStorage::new(temp_dir.path()), config, fonts);
    let report = engine.run(true).await?;

    let png_path = temp_dir.path().join("out").join("treemap.png");
    assert_eq!(report.png_path, Some(png_path.to_string_lossy().into_owned()));
    let png = std::fs::read(&png_path)?;
    // IHDR 寬高
    let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
    let height = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
    assert_eq!((width, height), (820, 1120));
    Ok(())
}

#[test]
fn test_prepared_table_loads() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let listing = "Department of Commerce\nTrade data $2 mil.\nDepartment of Labor\nSafety None reported\n";

    let parser = FundingListingParser::new()?;
    let totals = aggregate_by_department(&parser.parse_listing(listing));
    std::fs::write(temp_dir.path().join("funding.csv"), write_totals_csv(&totals)?)?;
    std::fs::write(temp_dir.path().join("words.json"), "{}")?;

    let loader = DataLoader::new(LocalStorage::new(temp_dir.path()));
    let data = tokio_test::block_on(loader.load("funding.csv", "words.json"))?;

    assert_eq!(data.records.len(), 2);
    assert_eq!(data.records[0].funding, 2_000_000.0);
    // 0 被視為缺值
    assert_eq!(data.records[1].funding, 1.0);
    assert!(data.words.is_empty());
    Ok(())
}
