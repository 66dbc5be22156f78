//! HX 解封装集成测试.
//!
//! 在内存中构造 HX 录像字节流, 测试完整的
//! 探测 → 扫描 → 时间对齐 → 访问单元组装 / 音频解码 流程.

use hxv_codec::decoders::alaw::alaw_to_pcm16;
use hxv_codec::{AccessUnitAssembler, CodecId};
use hxv_core::HxError;
use hxv_format::demuxers::hx::{StopReason, reconcile, scanner};
use hxv_format::io::IoContext;
use hxv_format::{BlockKind, Demuxer, FormatId, HxDemuxer};

// ============================================================
// 字节流构造辅助
// ============================================================

fn header(magic: &[u8; 4], width: u32, height: u32) -> Vec<u8> {
    let mut v = magic.to_vec();
    v.extend_from_slice(&width.to_le_bytes());
    v.extend_from_slice(&height.to_le_bytes());
    v.extend_from_slice(&[0; 4]);
    v
}

fn video_block(ts: u32, payload: &[u8]) -> Vec<u8> {
    let mut v = b"HXVF".to_vec();
    v.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    v.extend_from_slice(&ts.to_le_bytes());
    v.extend_from_slice(&[0; 4]);
    v.extend_from_slice(payload);
    v
}

fn nal(nal_type: u8, body: &[u8]) -> Vec<u8> {
    let mut v = vec![0, 0, 0, 1, nal_type << 1, 0x01];
    v.extend_from_slice(body);
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

fn footer_block(data: &[u8]) -> Vec<u8> {
    let mut v = b"HXFI".to_vec();
    v.extend_from_slice(&(data.len() as u32).to_le_bytes());
    v.extend_from_slice(data);
    v
}

fn open(data: Vec<u8>) -> (HxDemuxer, IoContext) {
    let mut io = IoContext::from_memory(data);
    let mut demuxer = HxDemuxer::new();
    demuxer.open(&mut io).expect("打开 HX 数据失败");
    (demuxer, io)
}

fn read_all(demuxer: &mut HxDemuxer, io: &mut IoContext) -> Vec<hxv_codec::Packet> {
    let mut packets = Vec::new();
    loop {
        match demuxer.read_packet(io) {
            Ok(pkt) => packets.push(pkt),
            Err(HxError::Eof) => break,
            Err(e) => panic!("读取数据包失败: {e}"),
        }
    }
    packets
}

// ============================================================
// 测试
// ============================================================

#[test]
fn test_单个视频块_端到端() {
    let mut data = header(b"HXVT", 704, 480);
    data.extend(video_block(1000, &[0x00, 0x00, 0x00, 0x01, 0x26, 0x01, 0xAF, 0x10]));

    let mut io = IoContext::from_memory(data.clone());
    let scan = scanner::scan(&mut io).unwrap();
    assert_eq!(scan.blocks.len(), 1);
    assert_eq!(scan.blocks[0].kind, BlockKind::VideoFrame);
    assert_eq!(scan.blocks[0].offset, 16);
    assert_eq!(scan.blocks[0].nalu_type, Some(19));
    assert_eq!(scan.stop_reason, StopReason::EndOfFile);

    let mut blocks = scan.blocks;
    reconcile::reconcile(&mut blocks);
    assert_eq!(blocks[0].relative_timestamp, Some(0));
    assert_eq!(blocks[0].duration, None);

    let (mut demuxer, mut io) = open(data);
    let packets = read_all(&mut demuxer, &mut io);
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].pts, 0);
    assert_eq!(packets[0].stream_index, 0);
    assert!(packets[0].is_keyframe);
    assert_eq!(packets[0].size(), 8);
}

#[test]
fn test_两个音频块_时长() {
    let mut data = header(b"HXVS", 640, 360);
    data.extend(audio_block(1000, &[0xD5, 0x55]));
    data.extend(audio_block(1020, &[0x2A, 0xAA]));

    let (mut demuxer, mut io) = open(data);
    let blocks = demuxer.blocks();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].duration, Some(20));
    assert_eq!(blocks[1].duration, None);

    let packets = read_all(&mut demuxer, &mut io);
    assert_eq!(packets.len(), 2);
    assert!(packets.iter().all(|p| p.stream_index == 1));
    // 每个 A-law 字节解码为 2 字节 PCM
    assert_eq!(packets[0].size(), 4);
    let expected: Vec<u8> = [0xD5u8, 0x55]
        .iter()
        .flat_map(|&b| alaw_to_pcm16(b).to_le_bytes())
        .collect();
    assert_eq!(&packets[0].data[..], &expected[..]);
    assert_eq!(packets[1].pts, 20);
}

#[test]
fn test_参数集与切片分组() {
    let mut data = header(b"HXVT", 704, 480);
    // 每个切片前都带一组参数集
    for (i, slice_type) in [19u8, 1, 1, 19, 1].iter().enumerate() {
        let ts = 1000 + i as u32 * 66;
        if *slice_type == 19 {
            data.extend(video_block(ts, &nal(32, &[0x0C])));
            data.extend(video_block(ts, &nal(33, &[0x01])));
            data.extend(video_block(ts, &nal(34, &[0xC1])));
        }
        data.extend(video_block(ts, &nal(*slice_type, &[i as u8; 10])));
    }

    let (mut demuxer, mut io) = open(data);
    assert_eq!(demuxer.streams()[0].nb_frames, 5);
    let packets = read_all(&mut demuxer, &mut io);
    assert_eq!(packets.len(), 5);

    let pts: Vec<i64> = packets.iter().map(|p| p.pts).collect();
    assert_eq!(pts, vec![0, 66, 132, 198, 264]);
    // IDR 访问单元含 3 个参数集 (各 7 字节) + 切片 (16 字节)
    assert_eq!(packets[0].size(), 3 * 7 + 16);
    assert_eq!(packets[1].size(), 16);
    assert!(packets[0].is_keyframe);
    assert!(!packets[1].is_keyframe);
    assert!(packets[3].is_keyframe);
    assert_eq!(demuxer.dropped_bytes(), 0);
}

#[test]
fn test_组装器_逐块拼接() {
    let mut assembler = AccessUnitAssembler::new();
    let vps = nal(32, &[0x0C]);
    let sps = nal(33, &[0x01]);
    let slice = nal(1, &[0x11, 0x22]);

    assert!(assembler.push(&vps, 0, None).is_none());
    assert!(assembler.push(&sps, 0, None).is_none());
    let au = assembler.push(&slice, 0, Some(40)).unwrap();
    let mut expected = vps.clone();
    expected.extend_from_slice(&sps);
    expected.extend_from_slice(&slice);
    assert_eq!(&au.payload[..], &expected[..]);

    // 末尾未被切片终结的字节被丢弃
    assert!(assembler.push(&vps, 40, None).is_none());
    assert_eq!(assembler.finish(), vps.len());
}

#[test]
fn test_末尾不完整访问单元被丢弃() {
    let mut data = header(b"HXVT", 704, 480);
    data.extend(video_block(0, &nal(19, &[0xAF])));
    data.extend(video_block(40, &nal(1, &[0x01])));
    data.extend(video_block(80, &nal(32, &[0x0C])));
    data.extend(video_block(80, &nal(33, &[0x01])));

    let (mut demuxer, mut io) = open(data);
    let packets = read_all(&mut demuxer, &mut io);
    // 3 个切片类型块中只有 2 个终结了访问单元
    assert_eq!(packets.len(), 2);
    assert_eq!(demuxer.dropped_bytes(), 14);
}

#[test]
fn test_乱序时间戳_按时间输出() {
    let mut data = header(b"HXVT", 704, 480);
    data.extend(video_block(2000, &nal(19, &[0xAF])));
    data.extend(video_block(2040, &nal(1, &[0x01])));
    data.extend(audio_block(1990, &[0xD5; 8]));
    data.extend(audio_block(2030, &[0xD5; 8]));
    data.extend(video_block(2080, &nal(1, &[0x02])));

    let (mut demuxer, mut io) = open(data);
    let order: Vec<(BlockKind, Option<i64>)> = demuxer
        .blocks()
        .iter()
        .map(|b| (b.kind, b.relative_timestamp))
        .collect();
    assert_eq!(
        order,
        vec![
            (BlockKind::AudioFrame, Some(0)),
            (BlockKind::VideoFrame, Some(10)),
            (BlockKind::AudioFrame, Some(40)),
            (BlockKind::VideoFrame, Some(50)),
            (BlockKind::VideoFrame, Some(90)),
        ]
    );

    let packets = read_all(&mut demuxer, &mut io);
    let pts: Vec<i64> = packets.iter().map(|p| p.pts).collect();
    let mut sorted = pts.clone();
    sorted.sort();
    assert_eq!(pts, sorted);
    assert_eq!(demuxer.duration(), Some(0.09));
}

#[test]
fn test_截断与未知标签() {
    let mut base = header(b"HXVT", 704, 480);
    base.extend(video_block(0, &nal(19, &[0xAF])));
    base.extend(audio_block(0, &[0xD5; 4]));

    // 最后一个块声明的长度越过文件末尾
    let mut truncated = base.clone();
    let mut partial = video_block(40, &nal(1, &[0x01; 64]));
    partial.truncate(40);
    truncated.extend(partial);
    let mut io = IoContext::from_memory(truncated);
    let scan = scanner::scan(&mut io).unwrap();
    assert_eq!(scan.blocks.len(), 2);
    assert_eq!(scan.stop_reason, StopReason::Truncated);

    // 未知标签之后的内容全部忽略
    let mut unknown = base.clone();
    unknown.extend_from_slice(b"ZZZZ");
    unknown.extend(video_block(40, &nal(1, &[0x01])));
    let mut io = IoContext::from_memory(unknown);
    let scan = scanner::scan(&mut io).unwrap();
    assert_eq!(scan.blocks.len(), 2);
    assert_eq!(scan.stop_reason, StopReason::UnknownTag(*b"ZZZZ"));

    // 尾部索引块被跳过, 不产生块
    let mut with_footer = base;
    with_footer.extend(footer_block(&[0xEE; 32]));
    with_footer.extend(audio_block(20, &[0xD5; 4]));
    let mut io = IoContext::from_memory(with_footer);
    let scan = scanner::scan(&mut io).unwrap();
    assert_eq!(scan.blocks.len(), 3);
    assert!(scan.blocks.iter().all(|b| b.kind != BlockKind::IndexFooter));
    assert_eq!(scan.stop_reason, StopReason::EndOfFile);
}

#[test]
fn test_魔数错误() {
    let mut data = b"RIFF".to_vec();
    data.extend_from_slice(&[0; 12]);
    let mut io = IoContext::from_memory(data);
    let mut demuxer = HxDemuxer::new();
    match demuxer.open(&mut io) {
        Err(HxError::BadMagic(tag)) => assert_eq!(&tag, b"RIFF"),
        other => panic!("应返回魔数错误, 实际: {:?}", other.err()),
    }
}

#[test]
fn test_注册表探测() {
    let registry = hxv::default_format_registry();
    let mut data = header(b"HXVS", 1280, 720);
    data.extend(audio_block(0, &[0xD5; 4]));
    let mut io = IoContext::from_memory(data);
    let demuxer = registry.open_input(&mut io, None).unwrap();
    assert_eq!(demuxer.format_id(), FormatId::Hx);
    assert_eq!(demuxer.streams()[0].codec_id, CodecId::H265);
    assert_eq!(demuxer.streams()[1].codec_id, CodecId::PcmS16le);
}
