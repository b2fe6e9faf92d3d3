use std::fmt;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ApertureElement {
    Slit,
    Flap,
}

impl ApertureElement {
    /// Bit of AUXILIARY.DOME.OPEN_MASK set while this element is open
    pub fn open_bit(&self) -> i64 {
        match self {
            ApertureElement::Slit => 1 << 1,
            ApertureElement::Flap => 1 << 2,
        }
    }
}

impl fmt::Display for ApertureElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApertureElement::Slit => f.write_str("slit"),
            ApertureElement::Flap => f.write_str("flap"),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Default)]
pub enum AperturePosition {
    #[default]
    Closed,
    Moving,
    Open,
}

impl AperturePosition {
    pub fn from_open(open: bool) -> Self {
        if open {
            Self::Open
        } else {
            Self::Closed
        }
    }
}
