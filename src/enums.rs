/// Range shifter thickness of the supported device set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Thickness {
    Cm2,
    Cm3,
    Cm5,
}

impl Thickness {
    pub fn from_cm(cm: u32) -> Option<Self> {
        match cm {
            2 => Some(Self::Cm2),
            3 => Some(Self::Cm3),
            5 => Some(Self::Cm5),
            _ => None,
        }
    }

    pub fn centimeters(self) -> u32 {
        match self {
            Self::Cm2 => 2,
            Self::Cm3 => 3,
            Self::Cm5 => 5,
        }
    }

    /// Device identifier written to RangeShifterID, e.g. "RS=3cm".
    pub fn device_id(self) -> String {
        format!("RS={}cm", self.centimeters())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EditMode {
    /// Insert a new range shifter into every ion beam, replacing any
    /// existing device and settings blocks.
    Add {
        thickness: Thickness,
        snout_position_mm: f64,
    },
    /// Update a range shifter that is already present. Only the supplied
    /// parameters are touched.
    Modify {
        thickness: Option<Thickness>,
        snout_position_mm: Option<f64>,
    },
}
