use anyhow::Result;
use chrono::{TimeDelta, TimeZone, Utc};
use httpmock::prelude::*;
use std::io::Read;
use tempfile::TempDir;
use tramite_dashboard::domain::model::{Category, RecordQuery, SearchFilter, WindowKind};
use tramite_dashboard::utils::validation::Validate;
use tramite_dashboard::{
    ApiRecordSource, DashboardConfig, DashboardEngine, DashboardError, DashboardPipeline,
    LocalStorage, LookupTables,
};

fn config_toml(endpoint: &str, output_path: &str) -> String {
    format!(
        r#"
[source]
endpoint = "{endpoint}"
timeout_seconds = 5

[calendar]
utc_offset = "-06:00"
week_start = "sunday"

[lookups]
status = "status.json"
pol = "pol.json"

[output]
output_path = "{output_path}"
formats = ["csv", "tsv"]
archive_name = "tablero.zip"
"#
    )
}

fn api_response() -> serde_json::Value {
    // 參考時間為本地 2024-05-15 06:00 (-06:00)
    let t0 = Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap();
    serde_json::json!({
        "isSuccess": true,
        "message": "OK",
        "data": {
            "value": [
                {"title": "TRA-1", "new_preestado2": 100000002, "new_eta": t0.to_rfc3339(), "new_pol": 1, "_customerid_value": "ACME"},
                {"title": "TRA-2", "new_preestado2": 100000002, "new_eta": (t0 + TimeDelta::days(2)).to_rfc3339(), "new_po": "PO-2"},
                {"title": "TRA-3", "new_preestado2": 100000002, "new_eta": (t0 + TimeDelta::days(40)).to_rfc3339()},
                {"title": "TRA-4", "new_preestado2": 100000002},
                {"title": "TRA-5", "new_preestado2": 100000001, "new_eta": (t0 - TimeDelta::days(3)).to_rfc3339()},
                {"title": "TRA-6", "new_preestado2": "100000010"},
                {"title": "TRA-7", "new_preestado2": 1}
            ]
        }
    })
}

#[tokio::test]
async fn test_dashboard_end_to_end() -> Result<()> {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/TransInternacional")
            .query_param("numFilter", "0")
            .query_param("textFilter", "");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(api_response());
    });

    let lookup_dir = TempDir::new()?;
    std::fs::write(
        lookup_dir.path().join("status.json"),
        r#"{"100000002": "En tránsito", "100000001": "En origen", "100000099": "Nuevo"}"#,
    )?;
    std::fs::write(lookup_dir.path().join("pol.json"), r#"{"1": "Shanghai"}"#)?;

    let output_dir = TempDir::new()?;
    let output_path = output_dir.path().to_string_lossy().to_string();
    let config = DashboardConfig::from_toml_str(&config_toml(
        &server.url("/api/TransInternacional"),
        &output_path,
    ))?;
    config.validate()?;

    let settings = config.report_settings()?;
    let lookups = LookupTables::load(&LocalStorage::new(lookup_dir.path()), &config.lookups).await?;
    assert_eq!(settings.rules.uncovered(lookups.known_status_codes()), vec![100000099]);

    let reference = Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap();
    let pipeline = DashboardPipeline::new(
        LocalStorage::new(output_path.clone()),
        ApiRecordSource::from_config(&config)?,
        settings,
        reference,
    )
    .with_lookups(lookups);
    let engine = DashboardEngine::new(pipeline);

    let report = engine.build_report().await?;
    assert_eq!(report.record_count, 7);
    assert_eq!(report.unclassified, 1);

    let in_transit = report.summary(Category::InTransit).expect("in transit summary");
    assert_eq!(in_transit.total, 4);
    let windows = in_transit.windows.as_ref().expect("windowed");
    assert_eq!(windows[&WindowKind::Day], 1);
    assert_eq!(windows[&WindowKind::Week], 2);
    assert_eq!(windows[&WindowKind::Month], 2);
    assert_eq!(windows[&WindowKind::Total], 4);
    assert_eq!(report.summary(Category::Origin).map(|s| s.total), Some(1));
    assert_eq!(report.summary(Category::InWarehouse).map(|s| s.total), Some(1));

    let today = report.drill_down("in_transit_day").expect("day table");
    assert_eq!(today.rows[0].pol, "Shanghai");
    assert_eq!(today.rows[0].status, "En tránsito");
    assert_eq!(today.rows[0].eta, "2024-05-15");

    let listing: Vec<_> = report.listing.iter().filter_map(|r| r.idtra()).collect();
    assert_eq!(listing, vec!["TRA-1", "TRA-2", "TRA-3"]);

    let written = engine.run().await?;
    assert_eq!(written, format!("{}/tablero.zip", output_path));
    api_mock.assert_hits(2);

    let file = std::fs::File::open(output_dir.path().join("tablero.zip"))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut drill_down = String::new();
    archive
        .by_name("drilldown/in_transit_week.tsv")?
        .read_to_string(&mut drill_down)?;
    let lines: Vec<&str> = drill_down.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "#IDTRA\tNombre Cliente\tPOL\tETA\tSTATUS\t#PO");
    assert_eq!(lines[2], "TRA-2\tDesconocido\tDesconocido\t2024-05-17\tEn tránsito\tPO-2");
    assert!(archive.by_name("listing.csv").is_ok());
    assert!(archive.by_name("summary.json").is_ok());

    Ok(())
}

#[tokio::test]
async fn test_filtered_query_is_forwarded() -> Result<()> {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .query_param("numFilter", "2")
            .query_param("textFilter", "MSCU1234567");
        then.status(200).json_body(api_response());
    });

    let output_dir = TempDir::new()?;
    let config = DashboardConfig::from_toml_str(&config_toml(
        &server.url("/api/TransInternacional"),
        &output_dir.path().to_string_lossy(),
    ))?;

    let reference = Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap();
    let pipeline = DashboardPipeline::new(
        LocalStorage::new(output_dir.path()),
        ApiRecordSource::from_config(&config)?,
        config.report_settings()?,
        reference,
    )
    .with_query(RecordQuery::new(SearchFilter::Container, "MSCU1234567"));

    let report = DashboardEngine::new(pipeline).build_report().await?;
    api_mock.assert();

    // 有篩選時列表包含全部記錄
    assert_eq!(report.listing.len(), 7);
    assert_eq!(report.listing[0].idtra(), Some("TRA-1"));
    assert_eq!(report.listing[3].idtra(), Some("TRA-5"));

    Ok(())
}

#[tokio::test]
async fn test_api_rejection_fails_run() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET);
        then.status(200).json_body(serde_json::json!({
            "isSuccess": false,
            "message": "Token vencido",
            "data": null
        }));
    });

    let output_dir = TempDir::new()?;
    let config = DashboardConfig::from_toml_str(&config_toml(
        &server.url("/api/TransInternacional"),
        &output_dir.path().to_string_lossy(),
    ))?;

    let pipeline = DashboardPipeline::new(
        LocalStorage::new(output_dir.path()),
        ApiRecordSource::from_config(&config)?,
        config.report_settings()?,
        Utc::now(),
    );

    let result = DashboardEngine::new(pipeline).run().await;
    match result {
        Err(DashboardError::ApiRejected { message }) => assert_eq!(message, "Token vencido"),
        other => panic!("expected rejection, got {:?}", other),
    }
    assert!(!output_dir.path().join("tablero.zip").exists());

    Ok(())
}
