//! H.265/HEVC NAL (Network Abstraction Layer) 单元解析.
//!
//! HEVC NAL 头部为 2 字节:
//! - forbidden_zero_bit (1 bit)
//! - nal_unit_type (6 bits)
//! - nuh_layer_id (6 bits)
//! - nuh_temporal_id_plus1 (3 bits)
//!
//! HX 录像中每个视频块的负载以 Annex B 起始码开头, 通常恰好包含一个 NAL 单元.
//! 观察到的样本均使用 4 字节起始码 `00 00 00 01`.

use hxv_core::{HxError, HxResult};

/// HEVC NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HevcNalUnitType {
    /// TRAIL_N (非参考尾随图像)
    TrailN,
    /// TRAIL_R (参考尾随图像)
    TrailR,
    /// TSA_N
    TsaN,
    /// TSA_R
    TsaR,
    /// STSA_N
    StsaN,
    /// STSA_R
    StsaR,
    /// RADL_N
    RadlN,
    /// RADL_R
    RadlR,
    /// RASL_N
    RaslN,
    /// RASL_R
    RaslR,
    /// BLA_W_LP (Broken Link Access)
    BlaWLp,
    /// BLA_W_RADL
    BlaWRadl,
    /// BLA_N_LP
    BlaNLp,
    /// IDR_W_RADL (Instantaneous Decoding Refresh)
    IdrWRadl,
    /// IDR_N_LP
    IdrNLp,
    /// CRA_NUT (Clean Random Access)
    Cra,
    /// VPS (Video Parameter Set)
    Vps,
    /// SPS (Sequence Parameter Set)
    Sps,
    /// PPS (Picture Parameter Set)
    Pps,
    /// AUD (Access Unit Delimiter)
    Aud,
    /// EOS (End of Sequence)
    Eos,
    /// EOB (End of Bitstream)
    Eob,
    /// FD (Filler Data)
    FillerData,
    /// PREFIX_SEI
    PrefixSei,
    /// SUFFIX_SEI
    SuffixSei,
    /// 保留或未定义的类型
    Unknown(u8),
}

impl HevcNalUnitType {
    /// 从类型编号创建
    pub fn from_type_id(id: u8) -> Self {
        match id {
            0 => Self::TrailN,
            1 => Self::TrailR,
            2 => Self::TsaN,
            3 => Self::TsaR,
            4 => Self::StsaN,
            5 => Self::StsaR,
            6 => Self::RadlN,
            7 => Self::RadlR,
            8 => Self::RaslN,
            9 => Self::RaslR,
            16 => Self::BlaWLp,
            17 => Self::BlaWRadl,
            18 => Self::BlaNLp,
            19 => Self::IdrWRadl,
            20 => Self::IdrNLp,
            21 => Self::Cra,
            32 => Self::Vps,
            33 => Self::Sps,
            34 => Self::Pps,
            35 => Self::Aud,
            36 => Self::Eos,
            37 => Self::Eob,
            38 => Self::FillerData,
            39 => Self::PrefixSei,
            40 => Self::SuffixSei,
            _ => Self::Unknown(id),
        }
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::TrailN => 0,
            Self::TrailR => 1,
            Self::TsaN => 2,
            Self::TsaR => 3,
            Self::StsaN => 4,
            Self::StsaR => 5,
            Self::RadlN => 6,
            Self::RadlR => 7,
            Self::RaslN => 8,
            Self::RaslR => 9,
            Self::BlaWLp => 16,
            Self::BlaWRadl => 17,
            Self::BlaNLp => 18,
            Self::IdrWRadl => 19,
            Self::IdrNLp => 20,
            Self::Cra => 21,
            Self::Vps => 32,
            Self::Sps => 33,
            Self::Pps => 34,
            Self::Aud => 35,
            Self::Eos => 36,
            Self::Eob => 37,
            Self::FillerData => 38,
            Self::PrefixSei => 39,
            Self::SuffixSei => 40,
            Self::Unknown(id) => *id,
        }
    }

    /// 类型名称 (与 H.265 标准命名一致)
    pub fn name(&self) -> &'static str {
        match self {
            Self::TrailN => "TRAIL_N",
            Self::TrailR => "TRAIL_R",
            Self::TsaN => "TSA_N",
            Self::TsaR => "TSA_R",
            Self::StsaN => "STSA_N",
            Self::StsaR => "STSA_R",
            Self::RadlN => "RADL_N",
            Self::RadlR => "RADL_R",
            Self::RaslN => "RASL_N",
            Self::RaslR => "RASL_R",
            Self::BlaWLp => "BLA_W_LP",
            Self::BlaWRadl => "BLA_W_RADL",
            Self::BlaNLp => "BLA_N_LP",
            Self::IdrWRadl => "IDR_W_RADL",
            Self::IdrNLp => "IDR_N_LP",
            Self::Cra => "CRA_NUT",
            Self::Vps => "VPS_NUT",
            Self::Sps => "SPS_NUT",
            Self::Pps => "PPS_NUT",
            Self::Aud => "AUD_NUT",
            Self::Eos => "EOS_NUT",
            Self::Eob => "EOB_NUT",
            Self::FillerData => "FD_NUT",
            Self::PrefixSei => "PREFIX_SEI_NUT",
            Self::SuffixSei => "SUFFIX_SEI_NUT",
            Self::Unknown(_) => "UNKNOWN",
        }
    }

    /// 是否为 VCL (Video Coding Layer) NAL
    pub fn is_vcl(&self) -> bool {
        self.type_id() < 32
    }

    /// 是否为 IRAP (Intra Random Access Point) NAL
    pub fn is_irap(&self) -> bool {
        matches!(self.type_id(), 16..=21)
    }

    /// 是否为 IDR NAL
    pub fn is_idr(&self) -> bool {
        matches!(self, Self::IdrWRadl | Self::IdrNLp)
    }

    /// 是否为参数集 (VPS/SPS/PPS)
    pub fn is_parameter_set(&self) -> bool {
        matches!(self, Self::Vps | Self::Sps | Self::Pps)
    }

    /// 是否结束一个访问单元
    ///
    /// HX 录像机只用 TRAIL_R 与 IDR_W_RADL 两种编码切片, 它们总是访问单元的最后一个 NAL.
    /// 其余类型 (参数集、AUD、SEI 等) 都出现在切片之前, 并共享切片的时间戳.
    pub fn terminates_access_unit(&self) -> bool {
        matches!(self, Self::TrailR | Self::IdrWRadl)
    }

    /// 以此类型结束的访问单元是否为关键帧
    pub fn marks_keyframe(&self) -> bool {
        matches!(self, Self::IdrWRadl)
    }
}

/// 读取 Annex B 负载开头的 NAL 单元类型编号
///
/// 支持 3 字节 (`00 00 01`) 与 4 字节 (`00 00 00 01`) 起始码.
/// 没有可识别的起始码, 或起始码之后缺少 NAL 头时返回 `None`.
pub fn nal_unit_type(data: &[u8]) -> Option<u8> {
    let header = if data.starts_with(&[0, 0, 1]) {
        data.get(3)
    } else if data.starts_with(&[0, 0, 0, 1]) {
        data.get(4)
    } else {
        None
    }?;
    Some((header >> 1) & 0x3F)
}

/// 识别 Annex B 负载开头的 NAL 单元类型
pub fn classify(data: &[u8]) -> Option<HevcNalUnitType> {
    nal_unit_type(data).map(HevcNalUnitType::from_type_id)
}

/// HEVC NAL 单元
#[derive(Debug, Clone)]
pub struct HevcNalUnit {
    /// NAL 类型
    pub nal_type: HevcNalUnitType,
    /// nuh_layer_id
    pub layer_id: u8,
    /// nuh_temporal_id_plus1
    pub temporal_id_plus1: u8,
    /// NAL 数据 (不含 2 字节 NAL 头)
    pub data: Vec<u8>,
}

impl HevcNalUnit {
    /// 从原始 NAL 数据 (含 2 字节头) 解析
    pub fn parse(data: &[u8]) -> HxResult<Self> {
        if data.len() < 2 {
            return Err(HxError::InvalidData("HEVC: NAL 数据太短".into()));
        }
        let nal_type = HevcNalUnitType::from_type_id((data[0] >> 1) & 0x3F);
        let layer_id = ((data[0] & 1) << 5) | (data[1] >> 3);
        let temporal_id_plus1 = data[1] & 0x07;

        Ok(Self {
            nal_type,
            layer_id,
            temporal_id_plus1,
            data: data[2..].to_vec(),
        })
    }

    /// 重建含 2 字节头的 NAL 数据
    pub fn to_bytes_with_header(&self) -> Vec<u8> {
        let byte0 = (self.nal_type.type_id() << 1) | (self.layer_id >> 5);
        let byte1 = ((self.layer_id & 0x1F) << 3) | self.temporal_id_plus1;
        let mut out = Vec::with_capacity(self.data.len() + 2);
        out.push(byte0);
        out.push(byte1);
        out.extend_from_slice(&self.data);
        out
    }
}

// ============================================================
// Annex B 分割
// ============================================================

/// 查找所有起始码位置
fn find_start_codes(data: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut i = 0;
    while i + 2 < data.len() {
        if data[i] == 0 && data[i + 1] == 0 {
            if data[i + 2] == 1 {
                positions.push(i);
                i += 3;
                continue;
            } else if i + 3 < data.len() && data[i + 2] == 0 && data[i + 3] == 1 {
                positions.push(i);
                i += 4;
                continue;
            }
        }
        i += 1;
    }
    positions
}

/// 跳过起始码, 返回 NAL 数据起始位置
fn skip_start_code(data: &[u8], pos: usize) -> usize {
    if data[pos..].starts_with(&[0, 0, 0, 1]) {
        pos + 4
    } else {
        pos + 3
    }
}

/// 从 Annex B 格式分割 HEVC NAL 单元
///
/// 每个 NAL 末尾的 trailing_zero 字节会被去除.
pub fn split_hevc_annex_b(data: &[u8]) -> Vec<HevcNalUnit> {
    let offsets = find_start_codes(data);
    let mut nalus = Vec::new();

    for (i, &start) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(data.len());
        let nal_start = skip_start_code(data, start);
        if nal_start >= end {
            continue;
        }
        let mut nal_end = end;
        while nal_end > nal_start && data[nal_end - 1] == 0x00 {
            nal_end -= 1;
        }
        if let Ok(nalu) = HevcNalUnit::parse(&data[nal_start..nal_end]) {
            nalus.push(nalu);
        }
    }
    nalus
}

/// Annex B → HVCC (4 字节大端长度前缀) 格式
///
/// Matroska 与 MP4 中的 HEVC 轨道要求长度前缀格式.
pub fn hevc_annex_b_to_hvcc(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for nalu in split_hevc_annex_b(data) {
        let bytes = nalu.to_bytes_with_header();
        out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(&bytes);
    }
    out
}

/// 移除 emulation prevention 字节 (0x03)
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if i + 2 < data.len() && data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 3 {
            out.push(0);
            out.push(0);
            i += 3; // 跳过 0x03
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    out
}

// ============================================================
// 参数集收集与 HEVCDecoderConfigurationRecord
// ============================================================

/// 从码流中收集到的参数集 (均含 2 字节 NAL 头)
#[derive(Debug, Clone, Default)]
pub struct ParameterSets {
    /// VPS 列表
    pub vps: Vec<Vec<u8>>,
    /// SPS 列表
    pub sps: Vec<Vec<u8>>,
    /// PPS 列表
    pub pps: Vec<Vec<u8>>,
}

impl ParameterSets {
    /// 从一段 Annex B 数据中收集参数集, 重复的参数集只保留一份
    pub fn absorb(&mut self, annex_b: &[u8]) {
        for nalu in split_hevc_annex_b(annex_b) {
            let list = match nalu.nal_type {
                HevcNalUnitType::Vps => &mut self.vps,
                HevcNalUnitType::Sps => &mut self.sps,
                HevcNalUnitType::Pps => &mut self.pps,
                _ => continue,
            };
            let bytes = nalu.to_bytes_with_header();
            if !list.contains(&bytes) {
                list.push(bytes);
            }
        }
    }

    /// VPS/SPS/PPS 是否都已收集到
    pub fn is_complete(&self) -> bool {
        !self.vps.is_empty() && !self.sps.is_empty() && !self.pps.is_empty()
    }

    /// 构建 hvcC (HEVCDecoderConfigurationRecord)
    pub fn to_hvcc(&self) -> HxResult<Vec<u8>> {
        let vps: Vec<&[u8]> = self.vps.iter().map(Vec::as_slice).collect();
        let sps: Vec<&[u8]> = self.sps.iter().map(Vec::as_slice).collect();
        let pps: Vec<&[u8]> = self.pps.iter().map(Vec::as_slice).collect();
        build_hvcc_config(&vps, &sps, &pps)
    }
}

/// 构建 HEVCDecoderConfigurationRecord
///
/// profile/level 从第一个 SPS 的 profile_tier_level 中读取, 其余字段取保守默认值
/// (4:2:0, 8 bit, 4 字节长度前缀).
pub fn build_hvcc_config(
    vps_list: &[&[u8]],
    sps_list: &[&[u8]],
    pps_list: &[&[u8]],
) -> HxResult<Vec<u8>> {
    let Some(sps_data) = sps_list.first() else {
        return Err(HxError::InvalidData(
            "HEVC: 构建 hvcC 需要至少一个 SPS".into(),
        ));
    };

    // SPS: NAL 头 (2 字节) 之后 1 字节为 vps_id/max_sub_layers/temporal_id_nesting,
    // 随后是 profile_tier_level
    let (general_profile_idc, general_level_idc) = if sps_data.len() >= 15 {
        let rbsp = remove_emulation_prevention(&sps_data[2..]);
        if rbsp.len() >= 13 {
            (rbsp[1] & 0x1F, rbsp[12])
        } else {
            (0, 0)
        }
    } else {
        (0, 0)
    };

    let mut buf = Vec::new();

    // configurationVersion = 1
    buf.push(1);
    // general_profile_space(2) | general_tier_flag(1) | general_profile_idc(5)
    buf.push(general_profile_idc & 0x1F);
    // general_profile_compatibility_flags (32 bits)
    buf.extend_from_slice(&[0; 4]);
    // general_constraint_indicator_flags (48 bits)
    buf.extend_from_slice(&[0; 6]);
    buf.push(general_level_idc);
    // min_spatial_segmentation_idc (reserved 4 bits + 12 bits)
    buf.extend_from_slice(&[0xF0, 0x00]);
    // parallelismType
    buf.push(0xFC);
    // chromaFormat = 1 (4:2:0)
    buf.push(0xFD);
    // bitDepthLumaMinus8 / bitDepthChromaMinus8
    buf.push(0xF8);
    buf.push(0xF8);
    // avgFrameRate
    buf.extend_from_slice(&[0, 0]);
    // constantFrameRate(2) | numTemporalLayers(3) | temporalIdNested(1) | lengthSizeMinusOne(2)
    buf.push(0x03);

    let arrays: [(u8, &[&[u8]]); 3] = [(32, vps_list), (33, sps_list), (34, pps_list)];
    let num_arrays = arrays.iter().filter(|(_, list)| !list.is_empty()).count();
    buf.push(num_arrays as u8);

    for (nal_type, list) in arrays {
        if list.is_empty() {
            continue;
        }
        // array_completeness = 1
        buf.push(0x80 | nal_type);
        buf.extend_from_slice(&(list.len() as u16).to_be_bytes());
        for nal in list {
            buf.extend_from_slice(&(nal.len() as u16).to_be_bytes());
            buf.extend_from_slice(nal);
        }
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hevc_nal_类型() {
        assert_eq!(HevcNalUnitType::from_type_id(19), HevcNalUnitType::IdrWRadl);
        assert_eq!(HevcNalUnitType::from_type_id(32), HevcNalUnitType::Vps);
        assert_eq!(HevcNalUnitType::from_type_id(63), HevcNalUnitType::Unknown(63));
        assert_eq!(HevcNalUnitType::Unknown(63).type_id(), 63);
        assert!(HevcNalUnitType::IdrWRadl.is_idr());
        assert!(HevcNalUnitType::IdrWRadl.is_irap());
        assert!(!HevcNalUnitType::TrailR.is_irap());
        assert!(HevcNalUnitType::TrailR.is_vcl());
        assert!(!HevcNalUnitType::Vps.is_vcl());
        assert_eq!(HevcNalUnitType::Sps.name(), "SPS_NUT");
    }

    #[test]
    fn test_访问单元结束类型() {
        for id in 0..64u8 {
            let t = HevcNalUnitType::from_type_id(id);
            assert_eq!(t.terminates_access_unit(), id == 1 || id == 19, "类型 {id}");
        }
    }

    #[test]
    fn test_关键帧类型() {
        for id in 0..64u8 {
            let t = HevcNalUnitType::from_type_id(id);
            assert_eq!(t.marks_keyframe(), id == 19, "类型 {id}");
        }
        // CRA 与 BLA 是 IRAP, 但不作为关键帧
        assert!(HevcNalUnitType::from_type_id(21).is_irap());
        assert!(!HevcNalUnitType::from_type_id(21).marks_keyframe());
    }

    #[test]
    fn test_nal_类型_4字节起始码() {
        // 0x26 = 19 << 1
        assert_eq!(nal_unit_type(&[0, 0, 0, 1, 0x26, 0x01]), Some(19));
        assert_eq!(classify(&[0, 0, 0, 1, 0x40, 0x01]), Some(HevcNalUnitType::Vps));
    }

    #[test]
    fn test_nal_类型_3字节起始码() {
        assert_eq!(nal_unit_type(&[0, 0, 1, 0x02, 0x01]), Some(1));
        assert_eq!(nal_unit_type(&[0, 0, 1, 0x44]), Some(34));
    }

    #[test]
    fn test_nal_类型_无法识别() {
        assert_eq!(nal_unit_type(&[]), None);
        assert_eq!(nal_unit_type(&[0, 0]), None);
        assert_eq!(nal_unit_type(&[0xFF, 0x00, 0x00, 0x01, 0x26]), None);
        // 起始码之后没有 NAL 头
        assert_eq!(nal_unit_type(&[0, 0, 0, 1]), None);
        assert_eq!(nal_unit_type(&[0, 0, 1]), None);
    }

    #[test]
    fn test_hevc_nal_解析与重建() {
        // type=33 (SPS), layer_id=0, temporal_id_plus1=1
        let data = vec![0x42, 0x01, 0xAA, 0xBB];
        let nalu = HevcNalUnit::parse(&data).unwrap();
        assert_eq!(nalu.nal_type, HevcNalUnitType::Sps);
        assert_eq!(nalu.layer_id, 0);
        assert_eq!(nalu.temporal_id_plus1, 1);
        assert_eq!(nalu.data, vec![0xAA, 0xBB]);
        assert_eq!(nalu.to_bytes_with_header(), data);
        assert!(HevcNalUnit::parse(&[0x42]).is_err());
    }

    #[test]
    fn test_annex_b_分割() {
        let mut data = Vec::new();
        data.extend_from_slice(&[0, 0, 0, 1, 0x40, 0x01, 0x11, 0x22]);
        data.extend_from_slice(&[0, 0, 1, 0x42, 0x01, 0x33]);
        data.extend_from_slice(&[0, 0, 0, 1, 0x44, 0x01, 0x44]);

        let nalus = split_hevc_annex_b(&data);
        assert_eq!(nalus.len(), 3);
        assert_eq!(nalus[0].nal_type, HevcNalUnitType::Vps);
        assert_eq!(nalus[1].nal_type, HevcNalUnitType::Sps);
        assert_eq!(nalus[2].nal_type, HevcNalUnitType::Pps);
    }

    #[test]
    fn test_annex_b_转_hvcc() {
        let annex_b = [0, 0, 0, 1, 0x26, 0x01, 0xAF, 0, 0, 1, 0x02, 0x01, 0xBB];
        let hvcc = hevc_annex_b_to_hvcc(&annex_b);
        assert_eq!(
            hvcc,
            vec![0, 0, 0, 3, 0x26, 0x01, 0xAF, 0, 0, 0, 3, 0x02, 0x01, 0xBB]
        );
    }

    #[test]
    fn test_emulation_prevention() {
        let data = [0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x03, 0x00];
        let rbsp = remove_emulation_prevention(&data);
        assert_eq!(rbsp, vec![0x00, 0x00, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_参数集收集() {
        let mut sets = ParameterSets::default();
        assert!(!sets.is_complete());
        assert!(sets.to_hvcc().is_err());

        sets.absorb(&[0, 0, 0, 1, 0x40, 0x01, 0x0C]);
        sets.absorb(&[0, 0, 0, 1, 0x42, 0x01, 0x01]);
        // 重复的 SPS 不应重复记录
        sets.absorb(&[0, 0, 0, 1, 0x42, 0x01, 0x01]);
        sets.absorb(&[0, 0, 0, 1, 0x44, 0x01, 0xC1]);
        // 切片不属于参数集
        sets.absorb(&[0, 0, 0, 1, 0x26, 0x01, 0xAF]);

        assert!(sets.is_complete());
        assert_eq!(sets.sps.len(), 1);
        assert_eq!(sets.sps[0], vec![0x42, 0x01, 0x01]);
    }

    #[test]
    fn test_hvcc_config_结构() {
        let vps = [0x40, 0x01, 0x0C, 0x01];
        let sps = [
            0x42, 0x01, 0x01, 0x01, 0x60, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x5D, 0xA0, 0x02, 0x80, 0x80,
        ];
        let pps = [0x44, 0x01, 0xC1, 0x72];

        let config = build_hvcc_config(&[&vps], &[&sps], &[&pps]).unwrap();
        assert_eq!(config[0], 1);
        // general_profile_idc = 1 (Main)
        assert_eq!(config[1], 0x01);
        // general_level_idc = 0x5D (level 3.1)
        assert_eq!(config[12], 0x5D);
        // lengthSizeMinusOne = 3
        assert_eq!(config[21] & 0x03, 3);
        assert_eq!(config[22], 3);
        // 第一个数组: VPS
        assert_eq!(config[23], 0x80 | 32);
        assert_eq!(&config[24..26], &[0, 1]);
        assert_eq!(&config[26..28], &[0, 4]);
        assert_eq!(&config[28..32], &vps);
    }
}
