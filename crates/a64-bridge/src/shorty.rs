//! Compact method signatures ("shorties").
//!
//! The first character is the return type, the rest are parameter types:
//! `V` void, `Z` boolean, `B` byte, `C` char, `S` short, `I` int, `J` long,
//! `F` float, `D` double, `L` reference. An instance method's `this` is not
//! part of the shorty.

use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortyType {
    Void,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegClass {
    Integer,
    Float,
}

impl ShortyType {
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'V' => ShortyType::Void,
            'Z' => ShortyType::Boolean,
            'B' => ShortyType::Byte,
            'C' => ShortyType::Char,
            'S' => ShortyType::Short,
            'I' => ShortyType::Int,
            'J' => ShortyType::Long,
            'F' => ShortyType::Float,
            'D' => ShortyType::Double,
            'L' => ShortyType::Reference,
            _ => return None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            ShortyType::Void => 'V',
            ShortyType::Boolean => 'Z',
            ShortyType::Byte => 'B',
            ShortyType::Char => 'C',
            ShortyType::Short => 'S',
            ShortyType::Int => 'I',
            ShortyType::Long => 'J',
            ShortyType::Float => 'F',
            ShortyType::Double => 'D',
            ShortyType::Reference => 'L',
        }
    }

    /// Register class an argument of this type is passed in; `None` for void.
    pub fn reg_class(self) -> Option<RegClass> {
        match self {
            ShortyType::Void => None,
            ShortyType::Float | ShortyType::Double => Some(RegClass::Float),
            _ => Some(RegClass::Integer),
        }
    }

    pub fn is_wide(self) -> bool {
        matches!(self, ShortyType::Long | ShortyType::Double)
    }

    /// Number of 32-bit argument-buffer words a value of this type occupies.
    pub fn vreg_words(self) -> usize {
        match self {
            ShortyType::Void => 0,
            ShortyType::Long | ShortyType::Double => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shorty {
    text: String,
    ret: ShortyType,
    params: Vec<ShortyType>,
}

impl Shorty {
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason| BridgeError::InvalidShorty {
            shorty: text.to_string(),
            reason,
        };
        let mut chars = text.chars();
        let ret = chars
            .next()
            .ok_or_else(|| invalid("empty shorty"))
            .and_then(|c| ShortyType::from_char(c).ok_or_else(|| invalid("unknown return type")))?;
        let params = chars
            .map(|c| match ShortyType::from_char(c) {
                Some(ShortyType::Void) => Err(invalid("void parameter")),
                Some(ty) => Ok(ty),
                None => Err(invalid("unknown parameter type")),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            text: text.to_string(),
            ret,
            params,
        })
    }

    pub fn return_type(&self) -> ShortyType {
        self.ret
    }

    pub fn params(&self) -> &[ShortyType] {
        &self.params
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Argument-buffer words needed for a call, including `this` for instance calls.
    pub fn arg_words(&self, is_static: bool) -> usize {
        let this = usize::from(!is_static);
        this + self.params.iter().map(|p| p.vreg_words()).sum::<usize>()
    }
}

impl FromStr for Shorty {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Shorty::parse(s)
    }
}

impl fmt::Display for Shorty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
