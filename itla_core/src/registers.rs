//! ITLA register map. Fixed vendor data; addresses and access modes come
//! from the OIF-ITLA MSA plus the Pure Photonics clean-mode extensions.

/// Pending-response / status register. Reads <= 16 and nonzero mean ready.
pub const NOP: u8 = 0x00;
/// Manufacturer string (AEA mode).
pub const MFGR: u8 = 0x02;
/// Model string (AEA mode).
pub const MODEL: u8 = 0x03;
/// Serial number string (AEA mode).
pub const SERIAL: u8 = 0x04;
/// Firmware release string (AEA mode).
pub const RELEASE: u8 = 0x06;
/// Window into AEA string data, two bytes per read.
pub const AEA_EAR: u8 = 0x0B;
/// Writing a valid channel triggers a tuning operation.
pub const CHANNEL: u8 = 0x30;
/// Enable output (8), disable (0), soft/hard reset bits.
pub const RESET_ENABLE: u8 = 0x32;
/// Frequency setpoint, integer THz part.
pub const FREQ_THZ: u8 = 0x35;
/// Frequency setpoint, fractional part in 0.1 GHz units.
pub const FREQ_GHZ: u8 = 0x36;
/// Frequency the laser reports, integer THz part.
pub const GET_FREQ_THZ: u8 = 0x40;
/// Frequency the laser reports, fractional part in 0.1 GHz units (signed).
pub const GET_FREQ_GHZ: u8 = 0x41;
/// Optical output power in 0.01 dBm units (signed).
pub const OOP: u8 = 0x42;
/// First tunable frequency, THz part.
pub const LFL1: u8 = 0x52;
/// First tunable frequency, 0.1 GHz part.
pub const LFL2: u8 = 0x53;
/// Last tunable frequency, THz part.
pub const LFH1: u8 = 0x54;
/// Last tunable frequency, 0.1 GHz part.
pub const LFH2: u8 = 0x55;
/// Dither (0) / no-dither (1) / whisper (2) mode select.
pub const MODE: u8 = 0x90;
/// Clean-sweep amplitude in GHz.
pub const CSWEEP_AMP: u8 = 0xE4;
/// Clean-sweep enable: 1 starts, 0 stops.
pub const CSWEEP_ON: u8 = 0xE5;
/// Offset from the sweep/jump center frequency in 0.1 GHz units (signed).
/// Shared between clean sweep and clean jump.
pub const CSWEEP_OFFSET: u8 = 0xE6;
/// Clean-sweep stop point in GHz; negatives encoded as 65536 + offset.
pub const CSWEEP_STOP: u8 = 0xE7;
/// Sled temperature slope in 0.0001 C/GHz units (signed, negative).
pub const SLED_SLOPE: u8 = 0xE8;
/// Clean-jump target current in 0.1 mA units.
pub const CJUMP_CURRENT: u8 = 0xE9;
/// Clean-jump target frequency, integer THz part.
pub const CJUMP_THZ: u8 = 0xEA;
/// Clean-jump target frequency, fractional part in 0.1 GHz units.
pub const CJUMP_GHZ: u8 = 0xEB;
/// Clean-jump target sled temperature in 0.01 C units.
pub const CJUMP_SLED: u8 = 0xEC;
/// Clean-jump trigger; written 1 four times (memory, filter 1, filter 2,
/// execute), then 0 to re-arm.
pub const CJUMP_ON: u8 = 0xED;
/// Clean-sweep speed in MHz/s.
pub const CSWEEP_SPEED: u8 = 0xF1;

/// Value written to [`RESET_ENABLE`] to turn the output on.
pub const SET_ON: u16 = 8;
/// Value written to [`RESET_ENABLE`] to turn the output off.
pub const SET_OFF: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

/// Register description used for logging and the CLI register listing.
#[derive(Debug, Clone, Copy)]
pub struct RegisterDef {
    pub address: u8,
    pub name: &'static str,
    pub access: Access,
    pub unit: &'static str,
}

pub const REGISTERS: &[RegisterDef] = &[
    RegisterDef { address: NOP, name: "NOP", access: Access::ReadWrite, unit: "status" },
    RegisterDef { address: MFGR, name: "Mfgr", access: Access::Read, unit: "string" },
    RegisterDef { address: MODEL, name: "Model", access: Access::Read, unit: "string" },
    RegisterDef { address: SERIAL, name: "Serial", access: Access::Read, unit: "string" },
    RegisterDef { address: RELEASE, name: "Release", access: Access::Read, unit: "string" },
    RegisterDef { address: AEA_EAR, name: "AeaEar", access: Access::ReadWrite, unit: "bytes" },
    RegisterDef { address: CHANNEL, name: "Channel", access: Access::ReadWrite, unit: "index" },
    RegisterDef { address: RESET_ENABLE, name: "ResetEnable", access: Access::ReadWrite, unit: "bits" },
    RegisterDef { address: FREQ_THZ, name: "FreqTHz", access: Access::ReadWrite, unit: "THz" },
    RegisterDef { address: FREQ_GHZ, name: "FreqGHz", access: Access::ReadWrite, unit: "0.1 GHz" },
    RegisterDef { address: GET_FREQ_THZ, name: "GetFreqTHz", access: Access::Read, unit: "THz" },
    RegisterDef { address: GET_FREQ_GHZ, name: "GetFreqGHz", access: Access::Read, unit: "0.1 GHz" },
    RegisterDef { address: OOP, name: "Oop", access: Access::Read, unit: "0.01 dBm" },
    RegisterDef { address: LFL1, name: "Lfl1", access: Access::Read, unit: "THz" },
    RegisterDef { address: LFL2, name: "Lfl2", access: Access::Read, unit: "0.1 GHz" },
    RegisterDef { address: LFH1, name: "Lfh1", access: Access::Read, unit: "THz" },
    RegisterDef { address: LFH2, name: "Lfh2", access: Access::Read, unit: "0.1 GHz" },
    RegisterDef { address: MODE, name: "Mode", access: Access::ReadWrite, unit: "mode" },
    RegisterDef { address: CSWEEP_AMP, name: "CsweepAmp", access: Access::ReadWrite, unit: "GHz" },
    RegisterDef { address: CSWEEP_ON, name: "CsweepOn", access: Access::ReadWrite, unit: "bool" },
    RegisterDef { address: CSWEEP_OFFSET, name: "CsweepOffset", access: Access::Read, unit: "0.1 GHz" },
    RegisterDef { address: CSWEEP_STOP, name: "CsweepStop", access: Access::ReadWrite, unit: "GHz" },
    RegisterDef { address: SLED_SLOPE, name: "SledSlope", access: Access::Read, unit: "0.0001 C/GHz" },
    RegisterDef { address: CJUMP_CURRENT, name: "CjumpCurrent", access: Access::ReadWrite, unit: "0.1 mA" },
    RegisterDef { address: CJUMP_THZ, name: "CjumpTHz", access: Access::ReadWrite, unit: "THz" },
    RegisterDef { address: CJUMP_GHZ, name: "CjumpGHz", access: Access::ReadWrite, unit: "0.1 GHz" },
    RegisterDef { address: CJUMP_SLED, name: "CjumpSled", access: Access::ReadWrite, unit: "0.01 C" },
    RegisterDef { address: CJUMP_ON, name: "CjumpOn", access: Access::Write, unit: "bool" },
    RegisterDef { address: CSWEEP_SPEED, name: "CsweepSpeed", access: Access::ReadWrite, unit: "MHz/s" },
];

/// Human-readable name for a register address, for trace output.
pub fn name(address: u8) -> &'static str {
    REGISTERS
        .iter()
        .find(|r| r.address == address)
        .map_or("unknown", |r| r.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_unique() {
        for (i, a) in REGISTERS.iter().enumerate() {
            for b in &REGISTERS[i + 1..] {
                assert_ne!(a.address, b.address, "{} vs {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn lookup_by_address() {
        assert_eq!(name(0x00), "NOP");
        assert_eq!(name(0xED), "CjumpOn");
        assert_eq!(name(0xFF), "unknown");
    }
}
