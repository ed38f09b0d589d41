//! CSV 行数据解析
//!
//! 读取表格导出的 CSV 文件（首行为表头），每条记录转换为一个 [`Row`]，
//! 所有单元格按字符串处理。支持带 BOM 的 UTF-8。

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use encoding_rs::UTF_8;
use encoding_rs_io::DecodeReaderBytesBuilder;
use tracing::{debug, info};

use crate::core::models::{AppResult, EnrichError, Row};

/// 从 CSV 文件加载行数据
pub fn load_rows_csv(path: &Path) -> AppResult<Vec<Row>> {
    let file = File::open(path)?;
    let rows = parse_csv_rows(file)?;
    info!("从 {} 读取了 {} 行", path.display(), rows.len());
    Ok(rows)
}

/// 从任意读取器解析 CSV，跳过全空的记录
pub fn parse_csv_rows<R: Read>(reader: R) -> AppResult<Vec<Row>> {
    // BOM 检测：有 BOM 时按 BOM 解码，否则按 UTF-8
    let decoded = DecodeReaderBytesBuilder::new()
        .encoding(Some(UTF_8))
        .bom_sniffing(true)
        .build(reader);

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // 允许行有不同数量的字段
        .from_reader(decoded);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(index, header)| normalize_header_name(header, index))
        .collect();

    if headers.is_empty() {
        return Err(EnrichError::InvalidInput("CSV 文件缺少表头".to_string()));
    }

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for result in csv_reader.records() {
        let record = result?;
        let row = Row::from_pairs(
            headers
                .iter()
                .enumerate()
                .map(|(index, header)| (header.clone(), record.get(index).unwrap_or("").to_string())),
        );

        if row.is_blank() {
            skipped += 1;
            continue;
        }
        rows.push(row);
    }

    debug!("CSV解析完成: 行数={}, 跳过空行={}", rows.len(), skipped);
    Ok(rows)
}

/// 表头规范化：合并空白；空表头用列序号代替
fn normalize_header_name(header: &str, index: usize) -> String {
    let collapsed = header.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        format!("column_{}", index + 1)
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_with_bom() {
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice(
            "Date,Media type,timestamp 1 link\n2024-01-01,VOD⏳,https://www.twitch.tv/videos/1\n"
                .as_bytes(),
        );

        let rows = parse_csv_rows(data.as_slice()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text("Date"), "2024-01-01");
        assert_eq!(rows[0].text("Media type"), "VOD⏳");
        assert_eq!(
            rows[0].text("timestamp 1 link"),
            "https://www.twitch.tv/videos/1"
        );
    }

    #[test]
    fn test_blank_records_skipped_and_short_records_padded() {
        let data = "A,B,C\n1,2,3\n,,\n4\n";
        let rows = parse_csv_rows(data.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].text("A"), "4");
        assert_eq!(rows[1].text("C"), "");
    }

    #[test]
    fn test_header_normalization() {
        let data = "  timestamp   1 link ,\nx,y\n";
        let rows = parse_csv_rows(data.as_bytes()).unwrap();
        let columns: Vec<&String> = rows[0].fields().keys().collect();
        assert_eq!(columns, vec!["timestamp 1 link", "column_2"]);
    }
}
