use serde::{Deserialize, Serialize};

/// Element types understood by the descriptor model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    /// Sentinel for descriptors whose type has not been initialised.
    Unknown,
    Ui8,
    Si8,
    QSymm8,
    QAsymm8,
    QAsymm8Signed,
    Ui16,
    Si16,
    QSymm16,
    QAsymm16,
    Ui32,
    Si32,
    Bf16,
    F16,
    F32,
}

impl DType {
    /// Size of one element in bytes, `None` for [`DType::Unknown`].
    pub fn size_in_bytes(self) -> Option<usize> {
        match self {
            DType::Unknown => None,
            DType::Ui8 | DType::Si8 | DType::QSymm8 | DType::QAsymm8 | DType::QAsymm8Signed => {
                Some(1)
            }
            DType::Ui16
            | DType::Si16
            | DType::QSymm16
            | DType::QAsymm16
            | DType::Bf16
            | DType::F16 => Some(2),
            DType::Ui32 | DType::Si32 | DType::F32 => Some(4),
        }
    }

    /// Returns `true` for affine (scale + offset) quantized integer types.
    pub fn is_quantized_asymmetric(self) -> bool {
        matches!(
            self,
            DType::QAsymm8 | DType::QAsymm8Signed | DType::QAsymm16
        )
    }

    /// Scalar type name used by the device compiler for `DATA_TYPE`.
    pub fn device_type_name(self) -> Option<&'static str> {
        match self {
            DType::Unknown => None,
            DType::Ui8 | DType::QAsymm8 => Some("uchar"),
            DType::Si8 | DType::QSymm8 | DType::QAsymm8Signed => Some("char"),
            DType::Ui16 | DType::QAsymm16 | DType::Bf16 => Some("ushort"),
            DType::Si16 | DType::QSymm16 => Some("short"),
            DType::Ui32 => Some("uint"),
            DType::Si32 => Some("int"),
            DType::F16 => Some("half"),
            DType::F32 => Some("float"),
        }
    }

    /// Canonical upper-case name, e.g. `QASYMM8`.
    pub fn name(self) -> &'static str {
        match self {
            DType::Unknown => "UNKNOWN",
            DType::Ui8 => "U8",
            DType::Si8 => "S8",
            DType::QSymm8 => "QSYMM8",
            DType::QAsymm8 => "QASYMM8",
            DType::QAsymm8Signed => "QASYMM8_SIGNED",
            DType::Ui16 => "U16",
            DType::Si16 => "S16",
            DType::QSymm16 => "QSYMM16",
            DType::QAsymm16 => "QASYMM16",
            DType::Ui32 => "U32",
            DType::Si32 => "S32",
            DType::Bf16 => "BFLOAT16",
            DType::F16 => "F16",
            DType::F32 => "F32",
        }
    }
}
