//! 块索引报表 (CSV).
//!
//! 每个对齐后的块一行: `type,timestamp,relative_timestamp,offset,size,duration,nalu_type`.
//! 未知的值留空.

use std::io::Write;

use anyhow::Result;
use hxv_format::Block;
use serde::Serialize;

/// 报表中的一行
#[derive(Debug, Serialize)]
struct BlockRow {
    #[serde(rename = "type")]
    kind: String,
    timestamp: u32,
    relative_timestamp: Option<i64>,
    offset: u64,
    size: u32,
    duration: Option<i64>,
    nalu_type: Option<u8>,
}

impl From<&Block> for BlockRow {
    fn from(block: &Block) -> Self {
        Self {
            kind: block.kind.to_string(),
            timestamp: block.raw_timestamp,
            relative_timestamp: block.relative_timestamp,
            offset: block.offset,
            size: block.length,
            duration: block.duration,
            nalu_type: block.nalu_type,
        }
    }
}

/// 写出块索引 CSV
pub fn write_block_csv<W: Write>(writer: W, blocks: &[Block]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for block in blocks {
        csv.serialize(BlockRow::from(block))?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hxv_format::BlockKind;

    #[test]
    fn test_csv_输出() {
        let mut video = Block::new(BlockKind::VideoFrame, 16, 8, 1000);
        video.relative_timestamp = Some(0);
        video.duration = Some(40);
        video.nalu_type = Some(19);
        let mut audio = Block::new(BlockKind::AudioFrame, 40, 6, 1020);
        audio.relative_timestamp = Some(20);

        let mut out = Vec::new();
        write_block_csv(&mut out, &[video, audio]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "type,timestamp,relative_timestamp,offset,size,duration,nalu_type",
                "HXVF,1000,0,16,8,40,19",
                "HXAF,1020,20,40,6,,",
            ]
        );
    }
}
