//! HX 恢复扫描集成测试.
//!
//! 测试分块标签搜索, 以及文件头损坏或结构化扫描提前结束时
//! 通过恢复扫描重建块列表的流程.

use std::path::Path;

use hxv::{RewrapOptions, rewrap_file};
use hxv_core::HxError;
use hxv_format::demuxers::hx::StopReason;
use hxv_format::demuxers::hx::recovery::{TagHit, find_tags, recover_blocks, validate_candidates};
use hxv_format::io::IoContext;
use hxv_format::{BlockKind, Demuxer, HxDemuxer};

fn header(magic: &[u8; 4]) -> Vec<u8> {
    let mut v = magic.to_vec();
    v.extend_from_slice(&704u32.to_le_bytes());
    v.extend_from_slice(&480u32.to_le_bytes());
    v.extend_from_slice(&[0; 4]);
    v
}

fn video_block(ts: u32, nal_type: u8, body: &[u8]) -> Vec<u8> {
    let mut payload = vec![0, 0, 0, 1, nal_type << 1, 0x01];
    payload.extend_from_slice(body);
    let mut v = b"HXVF".to_vec();
    v.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    v.extend_from_slice(&ts.to_le_bytes());
    v.extend_from_slice(&[0; 4]);
    v.extend_from_slice(&payload);
    v
}

fn audio_block(ts: u32, alaw: &[u8]) -> Vec<u8> {
    let mut v = b"HXAF".to_vec();
    v.extend_from_slice(&(alaw.len() as u32 + 4).to_le_bytes());
    v.extend_from_slice(&ts.to_le_bytes());
    v.extend_from_slice(&[0; 4]);
    v.extend_from_slice(&[0x00, 0x01, 0x50, 0x00]);
    v.extend_from_slice(alaw);
    v
}

/// 文件头后插入一段无法识别的数据, 结构化扫描会在此停止
fn damaged_middle() -> Vec<u8> {
    let mut data = header(b"HXVT");
    data.extend(video_block(1000, 19, &[0xAF; 8]));
    data.extend_from_slice(b"ZZZZ");
    data.extend_from_slice(&[0x5A; 12]);
    data.extend(video_block(1040, 1, &[0x11; 8]));
    data.extend(audio_block(1020, &[0xD5; 16]));
    data
}

fn write_input(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).expect("写入测试输入失败");
    path
}

#[test]
fn test_跨分块边界的魔数只找到一次() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = vec![0x00u8; 30];
    data.extend_from_slice(b"HXVS");
    data.extend_from_slice(&[0x00; 30]);
    let path = write_input(dir.path(), "split.265", &data);

    // 魔数位于 30..34, 分块大小 32 时被切成两半
    for chunk_size in [32usize, 31, 33, 4, 64] {
        let mut io = IoContext::open_read(&path).unwrap();
        let hits = find_tags(&mut io, chunk_size).unwrap();
        assert_eq!(
            hits,
            vec![TagHit {
                offset: 30,
                tag: *b"HXVS"
            }],
            "chunk_size={chunk_size}"
        );
    }
}

#[test]
fn test_候选校验() {
    let data = damaged_middle();
    let mut io = IoContext::from_memory(data);
    let hits = find_tags(&mut io, 16).unwrap();
    let tags: Vec<[u8; 4]> = hits.iter().map(|h| h.tag).collect();
    assert_eq!(tags, vec![*b"HXVT", *b"HXVF", *b"HXVF", *b"HXAF"]);

    let candidates = validate_candidates(&mut io, &hits).unwrap();
    assert!(candidates.iter().all(|c| c.valid));
    assert_eq!(candidates[1].length, Some(14));
    assert_eq!(candidates[3].raw_timestamp, Some(1020));
}

#[test]
fn test_扫描提前结束时使用恢复结果() {
    let data = damaged_middle();

    let mut io = IoContext::from_memory(data.clone());
    let mut plain = HxDemuxer::new();
    plain.open(&mut io).unwrap();
    assert_eq!(plain.blocks().len(), 1);
    assert_eq!(plain.stop_reason(), Some(StopReason::UnknownTag(*b"ZZZZ")));
    assert!(!plain.is_recovered());

    let mut io = IoContext::from_memory(data);
    let mut demuxer = HxDemuxer::new().with_recovery(16);
    demuxer.open(&mut io).unwrap();
    assert!(demuxer.is_recovered());
    assert_eq!(demuxer.header().map(|h| h.width), Some(704));

    let kinds: Vec<BlockKind> = demuxer.blocks().iter().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec![
            BlockKind::VideoFrame,
            BlockKind::AudioFrame,
            BlockKind::VideoFrame
        ]
    );

    let mut packets = Vec::new();
    loop {
        match demuxer.read_packet(&mut io) {
            Ok(pkt) => packets.push((pkt.stream_index, pkt.pts)),
            Err(HxError::Eof) => break,
            Err(e) => panic!("读取失败: {e}"),
        }
    }
    assert_eq!(packets, vec![(0, 0), (1, 20), (0, 40)]);
}

#[test]
fn test_文件头损坏_重建() {
    let mut data = b"\x00\x00\x00\x00".to_vec();
    data.extend_from_slice(&[0xFF; 12]);
    data.extend(video_block(500, 19, &[0xAF; 8]));
    data.extend(audio_block(500, &[0xD5; 16]));
    data.extend(video_block(540, 1, &[0x22; 8]));

    let mut io = IoContext::from_memory(data);
    let recovered = recover_blocks(&mut io, 8).unwrap();
    assert!(recovered.header.is_none());
    assert_eq!(recovered.blocks.len(), 3);
    assert_eq!(recovered.blocks[0].offset, 16);
    assert_eq!(recovered.blocks[0].nalu_type, Some(19));
}

#[test]
fn test_重封装_启用恢复() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = b"JUNK".to_vec();
    data.extend_from_slice(&[0; 12]);
    data.extend(video_block(0, 19, &[0xAF; 8]));
    data.extend(audio_block(10, &[0xD5; 16]));
    data.extend(video_block(40, 1, &[0x22; 8]));
    let input = write_input(dir.path(), "broken.265", &data);

    let result = rewrap_file(&input, None, &RewrapOptions::default(), |_| {});
    assert!(matches!(result, Err(HxError::BadMagic(_))));

    let options = RewrapOptions {
        recover: true,
        ..RewrapOptions::default()
    };
    let summary = rewrap_file(&input, None, &options, |_| {}).unwrap();
    assert!(summary.recovered);
    assert_eq!(summary.blocks, 3);
    assert_eq!(summary.video_packets, 2);
    assert_eq!(summary.audio_packets, 1);
    assert!(dir.path().join("broken.mkv").exists());
}
