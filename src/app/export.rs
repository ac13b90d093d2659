use crate::app::lookup::{LookupTable, LookupTables};
use crate::config::toml_config::OutputFormat;
use crate::core::grouping::{canonical_key, GroupCount};
use crate::core::window::Calendar;
use crate::domain::model::{fields, ChartSlice, DrillDownRow, DrillDownTable, ShipmentRecord};
use crate::utils::error::Result;
use serde_json::Value;

pub const DRILL_DOWN_HEADERS: [&str; 6] = ["#IDTRA", "Nombre Cliente", "POL", "ETA", "STATUS", "#PO"];

pub const LISTING_HEADERS: [&str; 27] = [
    "IDTRA",
    "Status",
    "Cliente",
    "Ejecutivo",
    "Contenedor",
    "Factura",
    "Commodity",
    "BCF",
    "PO",
    "POL",
    "POE",
    "Fecha ETA",
    "Confirmación de Zarpe",
    "Cantidad de Equipo",
    "Tamaño de Equipo",
    "Cantidad de Bultos",
    "Peso",
    "Certificado Origen",
    "Certificado Reexportación",
    "Exoneración",
    "Entrega BL Original",
    "Entrega Carta de Trazabilidad",
    "Fecha BL Impreso",
    "Fecha BL Digitado TICA",
    "Entrega de Traducción",
    "Liberación Documental",
    "Liberación Financiera",
];

const UNKNOWN: &str = "Desconocido";
const NOT_AVAILABLE: &str = "N/A";

fn text(record: &ShipmentRecord, name: &str) -> Option<String> {
    record
        .field(name)
        .and_then(canonical_key)
        .filter(|s| !s.is_empty())
}

fn local_date(record: &ShipmentRecord, name: &str, calendar: &Calendar, format: &str) -> String {
    record
        .timestamp(name, calendar.offset())
        .map(|ts| ts.with_timezone(&calendar.offset()).format(format).to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn yes_no(record: &ShipmentRecord, name: &str) -> String {
    let answer = if record.flag(name) { "Sí" } else { "No" };
    answer.to_string()
}

/// 明細表的一列，缺值用儀表板的預設字樣
pub fn drill_down_row(record: &ShipmentRecord, lookups: &LookupTables, calendar: &Calendar) -> DrillDownRow {
    DrillDownRow {
        idtra: text(record, fields::IDTRA).unwrap_or_else(|| "Sin IDTRA".to_string()),
        client: text(record, fields::CUSTOMER).unwrap_or_else(|| UNKNOWN.to_string()),
        pol: lookups
            .pol_name(record.field(fields::POL))
            .unwrap_or(UNKNOWN)
            .to_string(),
        eta: local_date(record, fields::ETA, calendar, "%Y-%m-%d"),
        status: lookups
            .status_name(record.field(fields::STATUS))
            .unwrap_or(UNKNOWN)
            .to_string(),
        po: text(record, fields::PO).unwrap_or_else(|| "Sin PO".to_string()),
    }
}

pub fn drill_down_table<'a, I>(
    name: impl Into<String>,
    title: impl Into<String>,
    records: I,
    lookups: &LookupTables,
    calendar: &Calendar,
) -> DrillDownTable
where
    I: IntoIterator<Item = &'a ShipmentRecord>,
{
    DrillDownTable {
        name: name.into(),
        title: title.into(),
        rows: records
            .into_iter()
            .map(|record| drill_down_row(record, lookups, calendar))
            .collect(),
    }
}

/// Listing columns in `LISTING_HEADERS` order. Codes are shown by name when a
/// lookup table knows them, otherwise raw.
pub fn listing_row(record: &ShipmentRecord, lookups: &LookupTables, calendar: &Calendar) -> Vec<String> {
    let named = |resolved: Option<&str>, name: &str| {
        resolved
            .map(str::to_string)
            .or_else(|| text(record, name))
            .unwrap_or_default()
    };
    let raw = |name: &str| text(record, name).unwrap_or_default();
    let date = |name: &str| local_date(record, name, calendar, "%d %b %y");

    vec![
        raw(fields::IDTRA),
        named(lookups.status_name(record.field(fields::STATUS)), fields::STATUS),
        raw(fields::CUSTOMER),
        named(lookups.executive_name(record.field(fields::EXECUTIVE)), fields::EXECUTIVE),
        raw(fields::CONTAINER),
        raw(fields::INVOICE),
        raw(fields::COMMODITY),
        raw(fields::BCF),
        raw(fields::PO),
        named(lookups.pol_name(record.field(fields::POL)), fields::POL),
        named(lookups.poe_name(record.field(fields::POE)), fields::POE),
        date(fields::ETA),
        date(fields::DEPARTURE_CONFIRMATION),
        raw(fields::EQUIPMENT_COUNT),
        raw(fields::EQUIPMENT_SIZE),
        raw(fields::PACKAGE_COUNT),
        raw(fields::WEIGHT),
        yes_no(record, fields::ORIGIN_CERTIFICATE),
        yes_no(record, fields::REEXPORT_CERTIFICATE),
        yes_no(record, fields::EXEMPTION),
        date(fields::BL_ORIGINAL_DELIVERY),
        date(fields::TRACEABILITY_LETTER),
        date(fields::BL_PRINTED),
        date(fields::BL_DIGITIZED),
        date(fields::TRANSLATION_DELIVERY),
        date(fields::DOCUMENT_RELEASE),
        date(fields::FINANCIAL_RELEASE),
    ]
}

/// Chart slices sorted by count (descending) then key. `labels` may be empty,
/// in which case the raw key doubles as the label.
pub fn chart_slices(counts: &GroupCount, labels: &LookupTable) -> Vec<ChartSlice> {
    let mut slices: Vec<ChartSlice> = counts
        .iter()
        .map(|(key, &value)| ChartSlice {
            id: key.clone(),
            label: labels
                .get(key)
                .filter(|name| !name.is_empty())
                .cloned()
                .unwrap_or_else(|| key.clone()),
            value,
        })
        .collect();
    slices.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.id.cmp(&b.id)));
    slices
}

/// Writes a delimited table (CSV or TSV) with a header row.
pub fn write_delimited<R, F>(format: OutputFormat, headers: &[&str], rows: R) -> Result<Vec<u8>>
where
    R: IntoIterator<Item = F>,
    F: IntoIterator<Item = String>,
{
    let delimiter = match format {
        OutputFormat::Tsv => b'\t',
        OutputFormat::Csv | OutputFormat::Json => b',',
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}

pub fn drill_down_fields(row: &DrillDownRow) -> [String; 6] {
    [
        row.idtra.clone(),
        row.client.clone(),
        row.pol.clone(),
        row.eta.clone(),
        row.status.clone(),
        row.po.clone(),
    ]
}

/// 表格依輸出格式編碼；JSON 直接序列化
pub fn encode_drill_down(format: OutputFormat, table: &DrillDownTable) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_vec_pretty(table)?),
        OutputFormat::Csv | OutputFormat::Tsv => write_delimited(
            format,
            &DRILL_DOWN_HEADERS,
            table.rows.iter().map(drill_down_fields),
        ),
    }
}

pub fn encode_listing(
    format: OutputFormat,
    records: &[ShipmentRecord],
    lookups: &LookupTables,
    calendar: &Calendar,
) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_vec_pretty(&Value::Array(
            records
                .iter()
                .map(|r| Value::Object(r.data.clone()))
                .collect(),
        ))?),
        OutputFormat::Csv | OutputFormat::Tsv => write_delimited(
            format,
            &LISTING_HEADERS,
            records.iter().map(|r| listing_row(r, lookups, calendar)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Weekday};
    use serde_json::json;

    fn record(value: Value) -> ShipmentRecord {
        serde_json::from_value(value).unwrap()
    }

    fn lookups() -> LookupTables {
        LookupTables {
            status: LookupTable::from([("100000002".to_string(), "En tránsito".to_string())]),
            pol: LookupTable::from([("3".to_string(), "Shanghai".to_string())]),
            executive: LookupTable::from([("7".to_string(), "María Rojas".to_string())]),
            ..Default::default()
        }
    }

    #[test]
    fn test_drill_down_row_resolves_names() {
        let row = drill_down_row(
            &record(json!({
                "title": "TRA-100",
                "_customerid_value": "ACME",
                "new_pol": 3,
                "new_eta": "2024-05-15T03:00:00Z",
                "new_preestado2": 100000002,
                "new_po": "PO-9"
            })),
            &lookups(),
            &Calendar::new(FixedOffset::west_opt(6 * 3600).unwrap(), Weekday::Sun),
        );

        assert_eq!(
            row,
            DrillDownRow {
                idtra: "TRA-100".to_string(),
                client: "ACME".to_string(),
                pol: "Shanghai".to_string(),
                // 本地時區仍是 5/14
                eta: "2024-05-14".to_string(),
                status: "En tránsito".to_string(),
                po: "PO-9".to_string(),
            }
        );
    }

    #[test]
    fn test_drill_down_row_keeps_date_only_eta_on_its_day() {
        let row = drill_down_row(
            &record(json!({"title": "TRA-2", "new_eta": "2024-05-15"})),
            &lookups(),
            &Calendar::new(FixedOffset::west_opt(6 * 3600).unwrap(), Weekday::Sun),
        );
        assert_eq!(row.eta, "2024-05-15");
    }

    #[test]
    fn test_drill_down_row_fallbacks() {
        let row = drill_down_row(
            &record(json!({"new_pol": 99, "new_preestado2": 1, "new_eta": "garbage"})),
            &lookups(),
            &Calendar::default(),
        );

        assert_eq!(row.idtra, "Sin IDTRA");
        assert_eq!(row.client, "Desconocido");
        assert_eq!(row.pol, "Desconocido");
        assert_eq!(row.eta, "N/A");
        assert_eq!(row.status, "Desconocido");
        assert_eq!(row.po, "Sin PO");
    }

    #[test]
    fn test_listing_row_formats_dates_and_flags() {
        let row = listing_row(
            &record(json!({
                "title": "TRA-1",
                "new_preestado2": 100000002,
                "new_ejecutivocomercial": 8,
                "new_eta": "2024-05-15T12:00:00Z",
                "new_aplicacertificadodeorigen": true,
                "new_llevaexoneracion": false,
                "new_cantequipo": 2,
                "new_liberacionmovimientoinventario": "2024-06-01T12:00:00Z"
            })),
            &lookups(),
            &Calendar::default(),
        );

        assert_eq!(row.len(), LISTING_HEADERS.len());
        assert_eq!(row[0], "TRA-1");
        assert_eq!(row[1], "En tránsito");
        assert_eq!(row[3], "8");
        assert_eq!(row[11], "15 May 24");
        assert_eq!(row[12], "N/A");
        assert_eq!(row[13], "2");
        assert_eq!(row[17], "Sí");
        assert_eq!(row[18], "No");
        assert_eq!(row[19], "No");
        assert_eq!(row[25], "01 Jun 24");
    }

    #[test]
    fn test_chart_slices_sorted_and_labelled() {
        let counts = GroupCount::from([
            ("7".to_string(), 2),
            ("8".to_string(), 5),
            ("9".to_string(), 2),
        ]);

        let slices = chart_slices(&counts, &lookups().executive);
        let ids: Vec<_> = slices.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["8", "7", "9"]);
        assert_eq!(slices[1].label, "María Rojas");
        assert_eq!(slices[0].label, "8");
    }

    #[test]
    fn test_encode_drill_down_csv_and_tsv() {
        let table = DrillDownTable {
            name: "origin".to_string(),
            title: "Cargas en Origen".to_string(),
            rows: vec![DrillDownRow {
                idtra: "TRA-1".to_string(),
                client: "ACME, S.A.".to_string(),
                pol: "Shanghai".to_string(),
                eta: "2024-05-15".to_string(),
                status: "En origen".to_string(),
                po: "PO-1".to_string(),
            }],
        };

        let csv = String::from_utf8(encode_drill_down(OutputFormat::Csv, &table).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "#IDTRA,Nombre Cliente,POL,ETA,STATUS,#PO");
        assert_eq!(lines[1], "TRA-1,\"ACME, S.A.\",Shanghai,2024-05-15,En origen,PO-1");

        let tsv = String::from_utf8(encode_drill_down(OutputFormat::Tsv, &table).unwrap()).unwrap();
        assert!(tsv.starts_with("#IDTRA\tNombre Cliente\tPOL"));

        let json: Value = serde_json::from_slice(&encode_drill_down(OutputFormat::Json, &table).unwrap()).unwrap();
        assert_eq!(json["rows"][0]["client"], "ACME, S.A.");
    }
}
