//! Byte layout of the serialized NSA structures
//!
//! All scalars and pointer fields are 4 bytes. Offsets are relative to the
//! start of the owning structure.
//!
//! # Root header
//! ```text
//! 0x00 duration f32                 0x58 reserved4 (0)
//! 0x04 sample_frequency f32         0x5C sampled_pos_quantisation_info ptr
//! 0x08 num_channel_sets             0x60 sampled_quat_quantisation_info ptr
//! 0x0C max_of_channel_num           0x64 reserved5 (0)
//! 0x10 max_num_comp_channels        0x68 reserved6 (0)
//! 0x14 reserved0 (0)                0x6C unchanging_data ptr
//! 0x18 unchanging_quat_map ptr      0x70 flat_section_data ptr    (flat)
//! 0x1C unchanging_pos_map ptr       0x74 flat_trajectory ptr      (flat)
//! 0x20 sampled_pos_map ptr          0x78 reserved7 (0)
//! 0x24 sampled_quat_map ptr         0x7C reserved8 (0)
//! 0x28 reserved_map ptr             0x80 section_grid ptr         (sectioned)
//! 0x2C pos_means_quantisation 24B   0x84 trajectory ptr           (sectioned)
//! 0x44 reserved1 (0)                0x88 max_section_size
//! 0x48 reserved2 (0)                0x8C section_start_frames ptr (sectioned)
//! 0x4C sampled_pos_num_qsets        0x90 section_sizes ptr        (sectioned)
//! 0x50 sampled_quat_num_qsets       0x94 num_channel_sections     (sectioned)
//! 0x54 reserved3 (0)                0x98 num_frame_sections       (sectioned)
//!                                   0x9C channel_names ptr
//!                                   0xA0 sampled_pos_maps ptr     (sectioned)
//!                                   0xA4 sampled_quat_maps ptr    (sectioned)
//!                                   0xA8 flags (bit 0 = cyclic)
//! ```
//!
//! # Sub-structures
//! ```text
//! ChannelMap:        num_channels u32, anim_channels u16[num_channels]
//! UnchangingData:    pos_n, quat_n, pos_quantisation 24B,
//!                    pos_data ptr -> u16[3n], quat_data ptr -> u16[3n], reserved u32[4]
//! SectionData:       start_frame, num_frames, num_pos, num_quat,
//!                    pos_channel_info ptr -> u16[4n], quat_channel_info ptr -> u16[4n],
//!                    pos_keys ptr -> u32[frames * n], quat_keys ptr -> u16[frames * n * 3]
//! TrajectorySource:  type_tag, num_frames, sample_frequency f32,
//!                    pos_quantisation 24B, quat_quantisation 24B,
//!                    pos_keys ptr -> u32[n], quat_keys ptr -> u16[3n]
//! ChannelNameTable:  num_entries, data_length, offsets ptr -> u32[n], data ptr -> u8[len]
//! ```

/// Size of every scalar and pointer field
pub const WORD: usize = 4;

/// Root animation header
pub mod header {
    pub const SIZE: usize = 0xAC;

    pub const DURATION: usize = 0x00;
    pub const SAMPLE_FREQUENCY: usize = 0x04;
    pub const NUM_CHANNEL_SETS: usize = 0x08;
    pub const MAX_OF_CHANNEL_NUM: usize = 0x0C;
    pub const MAX_NUM_COMP_CHANNELS: usize = 0x10;
    pub const UNCHANGING_QUAT_MAP: usize = 0x18;
    pub const UNCHANGING_POS_MAP: usize = 0x1C;
    pub const SAMPLED_POS_MAP: usize = 0x20;
    pub const SAMPLED_QUAT_MAP: usize = 0x24;
    pub const RESERVED_MAP: usize = 0x28;
    pub const POS_MEANS_QUANTISATION: usize = 0x2C;
    pub const SAMPLED_POS_NUM_QSETS: usize = 0x4C;
    pub const SAMPLED_QUAT_NUM_QSETS: usize = 0x50;
    pub const SAMPLED_POS_QINFO: usize = 0x5C;
    pub const SAMPLED_QUAT_QINFO: usize = 0x60;
    pub const UNCHANGING_DATA: usize = 0x6C;
    pub const FLAT_SECTION_DATA: usize = 0x70;
    pub const FLAT_TRAJECTORY: usize = 0x74;
    pub const SECTION_GRID: usize = 0x80;
    pub const TRAJECTORY: usize = 0x84;
    pub const MAX_SECTION_SIZE: usize = 0x88;
    pub const SECTION_START_FRAMES: usize = 0x8C;
    pub const SECTION_SIZES: usize = 0x90;
    pub const NUM_CHANNEL_SECTIONS: usize = 0x94;
    pub const NUM_FRAME_SECTIONS: usize = 0x98;
    pub const CHANNEL_NAMES: usize = 0x9C;
    pub const SAMPLED_POS_MAPS: usize = 0xA0;
    pub const SAMPLED_QUAT_MAPS: usize = 0xA4;
    pub const FLAGS: usize = 0xA8;

    /// Always-zero words of unknown purpose
    pub const RESERVED: [usize; 9] = [0x14, 0x44, 0x48, 0x54, 0x58, 0x64, 0x68, 0x78, 0x7C];

    /// Fields only the flat generation populates
    pub const FLAT_ONLY: [usize; 2] = [FLAT_SECTION_DATA, FLAT_TRAJECTORY];

    /// Fields only the sectioned generation populates
    pub const SECTIONED_ONLY: [usize; 8] = [
        SECTION_GRID,
        TRAJECTORY,
        SECTION_START_FRAMES,
        SECTION_SIZES,
        NUM_CHANNEL_SECTIONS,
        NUM_FRAME_SECTIONS,
        SAMPLED_POS_MAPS,
        SAMPLED_QUAT_MAPS,
    ];

    pub const FLAG_CYCLIC: u32 = 1;
}

pub mod channel_map {
    pub const NUM_CHANNELS: usize = 0x00;
    pub const ANIM_CHANNELS: usize = 0x04;
}

pub mod unchanging {
    pub const SIZE: usize = 0x38;

    pub const POS_NUM_CHANNELS: usize = 0x00;
    pub const QUAT_NUM_CHANNELS: usize = 0x04;
    pub const POS_QUANTISATION: usize = 0x08;
    pub const POS_DATA: usize = 0x20;
    pub const QUAT_DATA: usize = 0x24;
    pub const RESERVED: usize = 0x28;
    pub const NUM_RESERVED: usize = 4;
}

pub mod section {
    pub const SIZE: usize = 0x20;

    pub const START_FRAME: usize = 0x00;
    pub const NUM_FRAMES: usize = 0x04;
    pub const NUM_POS_CHANNELS: usize = 0x08;
    pub const NUM_QUAT_CHANNELS: usize = 0x0C;
    pub const POS_CHANNEL_INFO: usize = 0x10;
    pub const QUAT_CHANNEL_INFO: usize = 0x14;
    pub const POS_KEYS: usize = 0x18;
    pub const QUAT_KEYS: usize = 0x1C;

    /// u16 words per channel info record: mean xyz and quantisation set
    pub const CHANNEL_INFO_WORDS: usize = 4;
}

pub mod trajectory {
    pub const SIZE: usize = 0x44;

    pub const TYPE_TAG: usize = 0x00;
    pub const NUM_FRAMES: usize = 0x04;
    pub const SAMPLE_FREQUENCY: usize = 0x08;
    pub const POS_QUANTISATION: usize = 0x0C;
    pub const QUAT_QUANTISATION: usize = 0x24;
    pub const POS_KEYS: usize = 0x3C;
    pub const QUAT_KEYS: usize = 0x40;
}

pub mod name_table {
    pub const SIZE: usize = 0x10;

    pub const NUM_ENTRIES: usize = 0x00;
    pub const DATA_LENGTH: usize = 0x04;
    pub const OFFSETS: usize = 0x08;
    pub const DATA: usize = 0x0C;
}
