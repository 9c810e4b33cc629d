use std::fmt::Display;

use binbuf::prelude::*;
use thiserror::Error;

/// Static per-opcode requirement (§3 "Opcode permission table").
///
/// `Local` is preserved for forward compatibility even though no opcode
/// currently maps to it (§9 open questions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionClass {
    Open,
    Local,
    Auth,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("opcode {0} is not < OPCODE_COUNT")]
pub struct OpcodeError(pub u16);

macro_rules! opcodes {
    ($($variant:ident = $value:expr => $perm:ident),+ $(,)?) => {
        /// A 16-bit identifier naming a request variant (GLOSSARY "Opcode").
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Opcode {
            $($variant = $value),+
        }

        pub const OPCODE_COUNT: usize = opcodes!(@count $($variant),+);

        impl Opcode {
            pub const ALL: [Opcode; OPCODE_COUNT] = [$(Opcode::$variant),+];

            pub fn permission_class(self) -> PermissionClass {
                match self {
                    $(Opcode::$variant => PermissionClass::$perm),+
                }
            }
        }

        impl TryFrom<u16> for Opcode {
            type Error = OpcodeError;

            fn try_from(value: u16) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Opcode::$variant),)+
                    other => Err(OpcodeError(other)),
                }
            }
        }

        impl Display for Opcode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Opcode::$variant => write!(f, stringify!($variant))),+
                }
            }
        }
    };

    (@count $($variant:ident),+) => {
        <[()]>::len(&[$(opcodes!(@unit $variant)),+])
    };

    (@unit $variant:ident) => { () };
}

// Values are assigned in the order the historical wire protocol introduced
// them; gaps are not modeled because this is a from-scratch re-implementation
// (no existing deployed clients to stay byte-compatible with).
opcodes! {
    Null = 1 => Open,
    Online = 2 => Auth,
    Offline = 3 => Auth,
    Burst = 4 => Auth,
    AddServer = 5 => Auth,
    AddPeer = 6 => Auth,
    DelSource = 7 => Auth,
    ModifyMinpoll = 8 => Auth,
    ModifyMaxpoll = 9 => Auth,
    ModifyMaxdelay = 10 => Auth,
    ModifyMaxdelayratio = 11 => Auth,
    ModifyMaxdelaydevratio = 12 => Auth,
    ModifyMinstratum = 13 => Auth,
    ModifyPolltarget = 14 => Auth,
    ModifyMaxupdateskew = 15 => Auth,
    ModifyMakestep = 16 => Auth,
    Local = 17 => Auth,
    Reselect = 18 => Auth,
    Reselectdistance = 19 => Auth,
    Tracking = 20 => Open,
    Refresh = 21 => Auth,
    Rekey = 22 => Auth,
    Settime = 23 => Auth,
    Dfreq = 24 => Auth,
    Doffset = 25 => Auth,
    Makestep = 26 => Auth,
    NSources = 27 => Open,
    SourceData = 28 => Open,
    Sourcestats = 29 => Open,
    Rtcreport = 30 => Open,
    Activity = 31 => Open,
    Smoothing = 32 => Open,
    ManualList = 33 => Open,
    ClientAccessesByIndex = 34 => Auth,
    Allow = 35 => Auth,
    Allowall = 36 => Auth,
    Deny = 37 => Auth,
    Denyall = 38 => Auth,
    Cmdallow = 39 => Auth,
    Cmdallowall = 40 => Auth,
    Cmddeny = 41 => Auth,
    Cmddenyall = 42 => Auth,
    Accheck = 43 => Open,
    Cmdaccheck = 44 => Open,
    Manual = 45 => Auth,
    ManualDelete = 46 => Auth,
    Smoothtime = 47 => Auth,
    Writertc = 48 => Auth,
    Trimrtc = 49 => Auth,
    Dump = 50 => Auth,
    Cyclelogs = 51 => Auth,
    Logon = 52 => Open,
}

// Note: there is deliberately no `Readable` impl here. The raw `command`
// field in a request header is read as a plain `u16` (it may name an
// opcode the daemon has never heard of) and only turned into an `Opcode`
// during dispatch validation (§4.4 step 6), where an out-of-range value
// produces an `INVALID` reply rather than a buffer-level parse error.

impl Writeable for Opcode {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut impl ToWriteBuffer) -> Result<usize, Self::Error> {
        (*self as u16).write::<E>(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_count_matches_permission_table_invariant() {
        // §3: "The table's size must equal the total opcode count; this is
        // a load-time invariant."
        assert_eq!(Opcode::ALL.len(), OPCODE_COUNT);
        for op in Opcode::ALL {
            let _ = op.permission_class();
        }
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        assert_eq!(Opcode::try_from(0), Err(OpcodeError(0)));
        assert_eq!(Opcode::try_from(9999), Err(OpcodeError(9999)));
    }

    #[test]
    fn every_opcode_round_trips_its_numeric_value() {
        for op in Opcode::ALL {
            let value = op as u16;
            assert_eq!(Opcode::try_from(value), Ok(op));
        }
    }
}
