//! USB Vendor IDs for boards and serial adapters found on hobby controllers
//!
//! Selection is driven by manufacturer strings, but the VID is a useful hint
//! when listing ports for a human.

/// Arduino LLC / Arduino SA
pub mod arduino {
    pub const VID: u16 = 0x2341;
}

/// FTDI (Future Technology Devices International)
pub mod ftdi {
    pub const VID: u16 = 0x0403;

    /// All known FTDI product IDs
    pub const ALL_PIDS: &[u16] = &[0x6001, 0x6010, 0x6011, 0x6014, 0x6015];
}

/// Silicon Labs CP210x
pub mod cp210x {
    pub const VID: u16 = 0x10C4;

    /// All known CP210x product IDs
    pub const ALL_PIDS: &[u16] = &[0xEA60, 0xEA70, 0xEA71];
}

/// WCH CH340/CH341 (shows up as "wch.cn" or "QinHeng" on some hosts)
pub mod ch340 {
    pub const VID: u16 = 0x1A86;

    /// All known CH340/341 product IDs
    pub const ALL_PIDS: &[u16] = &[0x7523, 0x5523];
}

/// Check if a VID/PID is a known USB serial adapter or board
pub fn is_known_adapter(vid: u16, pid: u16) -> bool {
    match vid {
        arduino::VID => true,
        ftdi::VID => ftdi::ALL_PIDS.contains(&pid),
        cp210x::VID => cp210x::ALL_PIDS.contains(&pid),
        ch340::VID => ch340::ALL_PIDS.contains(&pid),
        _ => false,
    }
}

/// Get adapter type name from VID
pub fn adapter_name(vid: u16) -> Option<&'static str> {
    match vid {
        arduino::VID => Some("Arduino"),
        ftdi::VID => Some("FTDI"),
        cp210x::VID => Some("CP210x"),
        ch340::VID => Some("CH340"),
        _ => None,
    }
}
