use crate::domain::model::{HistoricalTable, TableRow};
use crate::domain::ports::Storage;
use crate::utils::error::{ForecastError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// 預設的季度欄位名稱
pub const DEFAULT_QUARTER_COLUMN: &str = "Trimestre";

/// 歷史資料表快取：第一次存取時載入，之後永久重用
pub struct DataCache<S: Storage> {
    storage: Arc<S>,
    path: String,
    quarter_column: String,
    table: OnceCell<Arc<HistoricalTable>>,
}

impl<S: Storage> DataCache<S> {
    pub fn new(storage: Arc<S>, path: impl Into<String>, quarter_column: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
            quarter_column: quarter_column.into(),
            table: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.table.initialized()
    }

    pub async fn get(&self) -> Result<Arc<HistoricalTable>> {
        self.table
            .get_or_try_init(|| async {
                let table = self.load().await?;
                Ok::<_, ForecastError>(Arc::new(table))
            })
            .await
            .cloned()
    }

    async fn load(&self) -> Result<HistoricalTable> {
        tracing::info!("📥 Loading historical data from {}", self.path);

        let bytes = self.storage.read_file(&self.path).await.map_err(|e| match e {
            ForecastError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                ForecastError::DataSourceMissing {
                    path: self.path.clone(),
                }
            }
            other => ForecastError::DataFormatError {
                message: format!("cannot read {}: {}", self.path, other),
            },
        })?;

        let table = parse_table(&bytes, &self.quarter_column)?;

        if table.sorted {
            tracing::info!(
                "✅ Loaded {} rows ({} columns) from {}",
                table.len(),
                table.columns.len(),
                self.path
            );
        } else {
            tracing::warn!(
                "⚠️ Quarter column '{}' not found in {}, rows left unsorted",
                self.quarter_column,
                self.path
            );
        }

        Ok(table)
    }
}

/// 解析 CSV；缺少季度欄位時保留原始順序而不是整體失敗
pub fn parse_table(bytes: &[u8], quarter_column: &str) -> Result<HistoricalTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| ForecastError::DataFormatError {
            message: format!("cannot read CSV header: {}", e),
        })?
        .iter()
        .map(str::to_string)
        .collect();

    let quarter_index = columns.iter().position(|c| c == quarter_column);

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ForecastError::DataFormatError {
            message: format!("invalid CSV record {}: {}", line + 1, e),
        })?;

        let quarter = quarter_index
            .and_then(|i| record.get(i))
            .filter(|q| !q.is_empty())
            .map(str::to_string);

        let values = columns
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != quarter_index)
            .map(|(i, name)| (name.clone(), record.get(i).and_then(parse_value)))
            .collect::<HashMap<_, _>>();

        rows.push(TableRow { quarter, values });
    }

    let sorted = quarter_index.is_some();
    if sorted {
        // 空白標籤排在最後
        rows.sort_by(|a, b| {
            (a.quarter.is_none(), &a.quarter).cmp(&(b.quarter.is_none(), &b.quarter))
        });
    }

    Ok(HistoricalTable {
        quarter_column: quarter_column.to_string(),
        columns,
        rows,
        sorted,
    })
}

fn parse_value(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>()
        .or_else(|_| cell.replace(',', ".").parse::<f64>())
        .ok()
        .filter(|v| v.is_finite())
}
