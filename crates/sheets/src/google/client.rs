//! Google Sheets v4 REST client and the [`RemoteSheet`] built on it.

use super::auth::{ServiceAccountKey, TokenSource};
use crate::error::{Result, SheetError};
use crate::remote::{RemoteConnector, RemoteSheet};
use crate::row::{row_values, COUNT_FORMAT, DIFF_FORMAT, ROW_WIDTH};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use vote_tracker_core::{GoogleSheetsConfig, TrackedPairDiff};

const HEADER_FILL: u32 = 0xF97316;

// =============================================================================
// SheetsClient
// =============================================================================

/// Properties of one tab in the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub index: i64,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    #[serde(default)]
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    #[serde(default)]
    updated_range: Option<String>,
}

/// Thin typed wrapper over the endpoints this crate uses.
pub struct SheetsClient {
    http: Client,
    api_url: String,
    spreadsheet_id: String,
    tokens: TokenSource,
}

impl std::fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsClient")
            .field("api_url", &self.api_url)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish_non_exhaustive()
    }
}

impl SheetsClient {
    pub fn new(
        http: Client,
        api_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        tokens: TokenSource,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            tokens,
        }
    }

    /// Tabs of the spreadsheet.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn sheets(&self) -> Result<Vec<SheetProperties>> {
        let url = self.spreadsheet_url("")?;
        let body: SpreadsheetResponse = self
            .send(Method::GET, url, &[("fields", "sheets.properties")], None)
            .await?;
        Ok(body.sheets.into_iter().map(|s| s.properties).collect())
    }

    /// Cell values of `range`, each rendered as text.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(range, "")?;
        let body: ValueRange = self.send(Method::GET, url, &[], None).await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    /// Overwrites `range` with raw values.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn update_values(&self, range: &str, values: Vec<Vec<Value>>) -> Result<()> {
        let url = self.values_url(range, "")?;
        let _: Value = self
            .send(
                Method::PUT,
                url,
                &[("valueInputOption", "RAW")],
                Some(json!({ "values": values })),
            )
            .await?;
        Ok(())
    }

    /// Appends rows after the last row of `range`.
    ///
    /// Returns the updated range, e.g. `Sheet1!A5:F5`, when reported.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn append_values(&self, range: &str, values: Vec<Vec<Value>>) -> Result<Option<String>> {
        let url = self.values_url(range, ":append")?;
        let body: AppendResponse = self
            .send(
                Method::POST,
                url,
                &[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")],
                Some(json!({ "values": values })),
            )
            .await?;
        Ok(body.updates.and_then(|u| u.updated_range))
    }

    /// Sends a `batchUpdate` with the given requests.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn batch_update(&self, requests: Vec<Value>) -> Result<()> {
        let url = self.spreadsheet_url(":batchUpdate")?;
        let _: Value = self
            .send(Method::POST, url, &[], Some(json!({ "requests": requests })))
            .await?;
        Ok(())
    }

    /// Adds a tab with the given grid size.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn add_sheet(&self, title: &str, rows: u32, columns: u32) -> Result<()> {
        self.batch_update(vec![json!({
            "addSheet": {
                "properties": {
                    "title": title,
                    "gridProperties": { "rowCount": rows, "columnCount": columns }
                }
            }
        })])
        .await
    }

    fn spreadsheet_url(&self, suffix: &str) -> Result<Url> {
        let mut url = self.base_url()?;
        url.path_segments_mut()
            .map_err(|()| SheetError::Configuration("Sheets API url cannot be a base".to_string()))?
            .push(&format!("{}{suffix}", self.spreadsheet_id));
        Ok(url)
    }

    fn values_url(&self, range: &str, suffix: &str) -> Result<Url> {
        let mut url = self.base_url()?;
        url.path_segments_mut()
            .map_err(|()| SheetError::Configuration("Sheets API url cannot be a base".to_string()))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{range}{suffix}"));
        Ok(url)
    }

    fn base_url(&self) -> Result<Url> {
        Url::parse(&format!("{}/spreadsheets", self.api_url))
            .map_err(|e| SheetError::Configuration(format!("invalid Sheets API url: {e}")))
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<T> {
        let token = self.tokens.token().await?;

        tracing::debug!("{} {}", method, url.path());

        let mut request = self.http.request(method, url).bearer_auth(token).query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SheetError::api(status.as_u16(), text));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Object(Default::default()))?);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `'Title'!cells`, quoting the title for A1 notation.
#[must_use]
pub fn a1(title: &str, cells: &str) -> String {
    format!("'{}'!{cells}", title.replace('\'', "''"))
}

/// Row number at the start of an `updatedRange` such as `'Sheet1'!A5:F5`.
fn first_row_of(range: &str) -> Option<u32> {
    let cells = range.rsplit('!').next()?;
    let start = cells.split(':').next()?;
    start
        .trim_start_matches(|c: char| c.is_ascii_alphabetic() || c == '$')
        .parse()
        .ok()
}

fn rgb(hex: u32) -> Value {
    let channel = |shift: u32| f64::from((hex >> shift) & 0xFF) / 255.0;
    json!({ "red": channel(16), "green": channel(8), "blue": channel(0) })
}

fn grid_range(sheet_id: i64, row_number: u32, start_col: usize, end_col: usize) -> Value {
    json!({
        "sheetId": sheet_id,
        "startRowIndex": row_number.saturating_sub(1),
        "endRowIndex": row_number,
        "startColumnIndex": start_col,
        "endColumnIndex": end_col,
    })
}

/// Orange bold white-on-orange centered header plus a frozen first row.
#[must_use]
pub fn header_format_requests(sheet_id: i64) -> Vec<Value> {
    vec![
        json!({
            "repeatCell": {
                "range": grid_range(sheet_id, 1, 0, ROW_WIDTH),
                "cell": { "userEnteredFormat": {
                    "backgroundColor": rgb(HEADER_FILL),
                    "textFormat": { "bold": true, "foregroundColor": rgb(0xFFFFFF) },
                    "horizontalAlignment": "CENTER"
                }},
                "fields": "userEnteredFormat(backgroundColor,textFormat,horizontalAlignment)"
            }
        }),
        json!({
            "updateSheetProperties": {
                "properties": { "sheetId": sheet_id, "gridProperties": { "frozenRowCount": 1 } },
                "fields": "gridProperties.frozenRowCount"
            }
        }),
    ]
}

/// Centered A:F, thousands format on B, D, F and signed format on C, E.
#[must_use]
pub fn row_format_requests(sheet_id: i64, row_number: u32) -> Vec<Value> {
    let number_format = |col: usize, pattern: &str| {
        json!({
            "repeatCell": {
                "range": grid_range(sheet_id, row_number, col, col + 1),
                "cell": { "userEnteredFormat": {
                    "numberFormat": { "type": "NUMBER", "pattern": pattern }
                }},
                "fields": "userEnteredFormat.numberFormat"
            }
        })
    };

    vec![
        json!({
            "repeatCell": {
                "range": grid_range(sheet_id, row_number, 0, ROW_WIDTH),
                "cell": { "userEnteredFormat": {
                    "horizontalAlignment": "CENTER",
                    "verticalAlignment": "MIDDLE"
                }},
                "fields": "userEnteredFormat(horizontalAlignment,verticalAlignment)"
            }
        }),
        number_format(1, COUNT_FORMAT),
        number_format(3, COUNT_FORMAT),
        number_format(5, COUNT_FORMAT),
        number_format(2, DIFF_FORMAT),
        number_format(4, DIFF_FORMAT),
    ]
}

// =============================================================================
// GoogleSheet
// =============================================================================

#[derive(Debug, Default)]
struct Cursor {
    /// Rows in column A, header included.
    rows: u32,
    last_label: Option<String>,
}

/// The tracker's data tab plus its marker tab.
#[derive(Debug)]
pub struct GoogleSheet {
    client: SheetsClient,
    sheet_id: i64,
    title: String,
    throttle_title: String,
    cursor: Mutex<Cursor>,
}

impl GoogleSheet {
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.cursor.lock().rows
    }

    fn remember_column(&self, column: &[String]) {
        let mut cursor = self.cursor.lock();
        cursor.rows = u32::try_from(column.len()).unwrap_or(u32::MAX);
        cursor.last_label = column
            .iter()
            .skip(1)
            .next_back()
            .filter(|l| !l.trim().is_empty())
            .cloned();
    }
}

#[async_trait]
impl RemoteSheet for GoogleSheet {
    async fn last_time_label(&self) -> Result<Option<String>> {
        // Other instances append to the same sheet, so re-read column A.
        self.time_column().await?;
        Ok(self.cursor.lock().last_label.clone())
    }

    async fn append_row(&self, row: &TrackedPairDiff) -> Result<u32> {
        let updated = self
            .client
            .append_values(&a1(&self.title, "A:F"), vec![row_values(row)])
            .await?;

        let mut cursor = self.cursor.lock();
        cursor.rows = updated
            .as_deref()
            .and_then(first_row_of)
            .unwrap_or(cursor.rows + 1);
        cursor.last_label = Some(row.ts_label.clone());
        Ok(cursor.rows)
    }

    async fn format_row(&self, row_number: u32) -> Result<()> {
        self.client
            .batch_update(row_format_requests(self.sheet_id, row_number))
            .await
    }

    async fn read_marker(&self) -> Result<Option<String>> {
        let values = self.client.get_values(&a1(&self.throttle_title, "A1")).await?;
        Ok(values
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .filter(|v| !v.trim().is_empty()))
    }

    async fn write_marker(&self, unix_secs: i64) -> Result<()> {
        self.client
            .update_values(&a1(&self.throttle_title, "A1"), vec![vec![json!(unix_secs.to_string())]])
            .await
    }

    async fn time_column(&self) -> Result<Vec<String>> {
        let column: Vec<String> = self
            .client
            .get_values(&a1(&self.title, "A:A"))
            .await?
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect();
        self.remember_column(&column);
        Ok(column)
    }

    async fn row_values(&self, index: usize) -> Result<Vec<String>> {
        let n = index + 1;
        let values = self
            .client
            .get_values(&a1(&self.title, &format!("A{n}:F{n}")))
            .await?;
        Ok(values.into_iter().next().unwrap_or_default())
    }
}

// =============================================================================
// Connector
// =============================================================================

/// Connects to the configured spreadsheet and bootstraps it.
#[derive(Debug, Clone)]
pub struct GoogleSheetsConnector {
    config: GoogleSheetsConfig,
    header: [String; ROW_WIDTH],
    timeout: Duration,
    fixed_token: Option<String>,
}

impl GoogleSheetsConnector {
    pub fn new(config: GoogleSheetsConfig, header: [String; ROW_WIDTH], timeout: Duration) -> Self {
        Self {
            config,
            header,
            timeout,
            fixed_token: None,
        }
    }

    /// Skips the service-account exchange (useful for testing).
    #[must_use]
    pub fn with_fixed_token(mut self, token: impl Into<String>) -> Self {
        self.fixed_token = Some(token.into());
        self
    }

    /// Opens the spreadsheet, creating the marker tab and header when missing.
    ///
    /// # Errors
    /// Returns [`SheetError::MissingCredentials`] without a spreadsheet id or
    /// key, otherwise the first failing request.
    pub async fn open(&self) -> Result<GoogleSheet> {
        if self.config.spreadsheet_id.trim().is_empty() {
            return Err(SheetError::MissingCredentials(
                "google.spreadsheet_id must be set".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| SheetError::Network(format!("failed to build HTTP client: {e}")))?;

        let tokens = match &self.fixed_token {
            Some(token) => TokenSource::fixed(token.clone()),
            None => {
                let key = ServiceAccountKey::load(&self.config)?;
                TokenSource::service_account(&key, &self.config.token_url, http.clone())?
            }
        };
        let client = SheetsClient::new(http, &self.config.api_url, &self.config.spreadsheet_id, tokens);

        let tabs = client.sheets().await?;
        let data_tab = tabs
            .iter()
            .filter(|t| t.title != self.config.throttle_sheet)
            .min_by_key(|t| t.index)
            .cloned()
            .ok_or_else(|| SheetError::Configuration("spreadsheet has no data sheet".to_string()))?;

        if !tabs.iter().any(|t| t.title == self.config.throttle_sheet) {
            client.add_sheet(&self.config.throttle_sheet, 1, 1).await?;
            client
                .update_values(&a1(&self.config.throttle_sheet, "A1"), vec![vec![json!("0")]])
                .await?;
            tracing::info!(sheet = %self.config.throttle_sheet, "Created marker sheet");
        }

        let sheet = GoogleSheet {
            client,
            sheet_id: data_tab.sheet_id,
            title: data_tab.title,
            throttle_title: self.config.throttle_sheet.clone(),
            cursor: Mutex::new(Cursor::default()),
        };

        let mut column = sheet.time_column().await?;
        if column.first().map_or(true, |h| h.trim().is_empty()) {
            let header = self.header.iter().map(|h| json!(h)).collect();
            sheet
                .client
                .update_values(&a1(&sheet.title, "A1:F1"), vec![header])
                .await?;
            sheet
                .client
                .batch_update(header_format_requests(sheet.sheet_id))
                .await?;
            if column.is_empty() {
                column.push(String::new());
            }
            column[0] = self.header[0].clone();
            sheet.remember_column(&column);
            tracing::info!(title = %sheet.title, "Wrote remote header");
        }

        tracing::info!(
            title = %sheet.title,
            rows = sheet.row_count(),
            "Google Sheet connected"
        );
        Ok(sheet)
    }
}

#[async_trait]
impl RemoteConnector for GoogleSheetsConnector {
    async fn connect(&self) -> Result<Arc<dyn RemoteSheet>> {
        Ok(Arc::new(self.open().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteSession;
    use crate::writer::{DualSinkWriter, WriteMode, WriterConfig};
    use chrono::TimeZone;
    use vote_tracker_core::{AppConfig, Candidate, Snapshot, TrackedPair};
    use wiremock::matchers::{body_partial_json, header, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn connector(server: &MockServer) -> GoogleSheetsConnector {
        let mut config = AppConfig::default().google;
        config.spreadsheet_id = "sid".to_string();
        config.api_url = server.uri();
        let header = TrackedPair::new("T1 Doran", "Hanwha Life Esports Gumayusi")
            .with_labels("Doran", "Gumayusi")
            .header();
        GoogleSheetsConnector::new(config, header, Duration::from_secs(5)).with_fixed_token("t0k")
    }

    fn row(label: &str) -> TrackedPairDiff {
        TrackedPairDiff {
            ts_label: label.to_string(),
            a_votes: 1200,
            a_diff: 10,
            b_votes: 1000,
            b_diff: -3,
            gap: 200,
        }
    }

    async fn mount_metadata(server: &MockServer, with_throttle: bool) {
        let mut sheets = vec![json!({ "properties": { "sheetId": 0, "title": "Sheet1", "index": 0 } })];
        if with_throttle {
            sheets.push(json!({ "properties": { "sheetId": 77, "title": "_throttle", "index": 1 } }));
        }
        Mock::given(method("GET"))
            .and(path("/spreadsheets/sid"))
            .and(header("authorization", "Bearer t0k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sheets": sheets })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_a1_quotes_titles() {
        assert_eq!(a1("Sheet1", "A:A"), "'Sheet1'!A:A");
        assert_eq!(a1("Bob's", "A1"), "'Bob''s'!A1");
    }

    #[test]
    fn test_first_row_of_updated_range() {
        assert_eq!(first_row_of("Sheet1!A5:F5"), Some(5));
        assert_eq!(first_row_of("'Vote Tracker'!A12:F12"), Some(12));
        assert_eq!(first_row_of("garbage"), None);
    }

    #[test]
    fn test_row_format_requests_layout() {
        let requests = row_format_requests(0, 5);
        assert_eq!(requests.len(), 6);
        let align = &requests[0]["repeatCell"];
        assert_eq!(align["range"]["startRowIndex"], 4);
        assert_eq!(align["range"]["endRowIndex"], 5);
        assert_eq!(align["range"]["endColumnIndex"], 6);
        assert_eq!(requests[1]["repeatCell"]["range"]["startColumnIndex"], 1);
        assert_eq!(
            requests[1]["repeatCell"]["cell"]["userEnteredFormat"]["numberFormat"]["pattern"],
            COUNT_FORMAT
        );
        assert_eq!(requests[4]["repeatCell"]["range"]["startColumnIndex"], 2);
        assert_eq!(
            requests[5]["repeatCell"]["cell"]["userEnteredFormat"]["numberFormat"]["pattern"],
            DIFF_FORMAT
        );
    }

    #[test]
    fn test_header_color() {
        let requests = header_format_requests(3);
        let bg = &requests[0]["repeatCell"]["cell"]["userEnteredFormat"]["backgroundColor"];
        assert!((bg["red"].as_f64().unwrap() - 249.0 / 255.0).abs() < 1e-9);
        assert_eq!(requests[1]["updateSheetProperties"]["properties"]["sheetId"], 3);
    }

    #[tokio::test]
    async fn test_open_bootstraps_empty_spreadsheet() {
        let server = MockServer::start().await;
        mount_metadata(&server, false).await;

        Mock::given(method("POST"))
            .and(path("/spreadsheets/sid:batchUpdate"))
            .and(body_partial_json(json!({ "requests": [{ "addSheet": { "properties": { "title": "_throttle" } } }] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(r"_throttle('|%27)!A1$"))
            .and(body_partial_json(json!({ "values": [["0"]] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"Sheet1('|%27)!A:A$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "range": "Sheet1!A1:A1000" })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(r"Sheet1('|%27)!A1:F1$"))
            .and(body_partial_json(json!({ "values": [["Time", "Doran Votes"]] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/spreadsheets/sid:batchUpdate"))
            .and(body_partial_json(json!({ "requests": [{ "repeatCell": { "range": { "startRowIndex": 0 } } }] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let sheet = connector(&server).open().await.unwrap();
        assert_eq!(sheet.row_count(), 1);
        assert!(sheet.last_time_label().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_existing_sheet_counts_rows_and_appends() {
        let server = MockServer::start().await;
        mount_metadata(&server, true).await;

        Mock::given(method("GET"))
            .and(path_regex(r"Sheet1('|%27)!A:A$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [["Time"], ["2026-02-25 16:29:30"], ["2026-02-25 16:30:31"]]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"Sheet1('|%27)!A:F:append$"))
            .and(body_partial_json(json!({ "values": [["2026-02-25 16:31:32", 1200, 10, 1000, -3, 200]] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "updates": { "updatedRange": "Sheet1!A4:F4" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sheet = connector(&server).open().await.unwrap();
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(
            sheet.last_time_label().await.unwrap().as_deref(),
            Some("2026-02-25 16:30:31")
        );

        let row_number = sheet.append_row(&row("2026-02-25 16:31:32")).await.unwrap();
        assert_eq!(row_number, 4);
        assert_eq!(sheet.row_count(), 4);
    }

    #[tokio::test]
    async fn test_same_minute_check_sees_rows_from_other_writers() {
        let server = MockServer::start().await;
        mount_metadata(&server, true).await;

        // Column A at connect time, then after another instance appended.
        Mock::given(method("GET"))
            .and(path_regex(r"Sheet1('|%27)!A:A$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [["Time"], ["2026-02-25 16:28:10"]]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"Sheet1('|%27)!A:A$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [["Time"], ["2026-02-25 16:28:10"], ["2026-02-25 16:29:30"]]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"Sheet1('|%27)!A:F:append$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "updates": { "updatedRange": "Sheet1!A4:F4" }
            })))
            .expect(0)
            .mount(&server)
            .await;

        let session = Arc::new(RemoteSession::new(Arc::new(connector(&server))));
        session.sheet().await.unwrap();

        let pair = TrackedPair::new("T1 Doran", "Hanwha Life Esports Gumayusi");
        let config = WriterConfig {
            mode: WriteMode::Direct,
            ..WriterConfig::default()
        };
        let writer = DualSinkWriter::new(pair, config).with_remote(session);

        let ts = chrono::FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 2, 25, 16, 29, 45)
            .unwrap();
        let snapshot = Snapshot::new(
            ts,
            vec![
                Candidate::new("1", "T1 Doran", 1200),
                Candidate::new("2", "Hanwha Life Esports Gumayusi", 1000),
            ],
        );
        assert!(writer.write(&snapshot, None, None, true).await.is_some());
    }

    #[tokio::test]
    async fn test_marker_round_trip_and_quota() {
        let server = MockServer::start().await;
        mount_metadata(&server, true).await;
        Mock::given(method("GET"))
            .and(path_regex(r"Sheet1('|%27)!A:A$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "values": [["Time"]] })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"_throttle('|%27)!A1$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "values": [["1700000000"]] })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(r"_throttle('|%27)!A1$"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Quota exceeded"))
            .mount(&server)
            .await;

        let sheet = connector(&server).open().await.unwrap();
        assert_eq!(sheet.read_marker().await.unwrap().as_deref(), Some("1700000000"));
        assert!(sheet.write_marker(1_700_000_060).await.unwrap_err().is_rate_limited());
    }

    #[tokio::test]
    async fn test_open_without_spreadsheet_id_is_missing_credentials() {
        let server = MockServer::start().await;
        let mut connector = connector(&server);
        connector.config.spreadsheet_id = String::new();
        assert!(connector.open().await.unwrap_err().is_missing_credentials());
    }

    #[tokio::test]
    async fn test_open_without_key_is_missing_credentials() {
        let server = MockServer::start().await;
        let mut connector = connector(&server);
        connector.fixed_token = None;
        assert!(connector.open().await.unwrap_err().is_missing_credentials());
    }
}
