//! Physical units and unit-bearing quantities.
//!
//! Units are tracked as exponents over a small set of base dimensions plus a
//! scale factor relative to the SI coherent unit. Two units are compatible when
//! their dimensions agree, regardless of scale, so `10*angstrom` can stand in
//! wherever a length in nanometers is expected.
//!
//! Quantities are written the way configuration authors are used to seeing
//! them, e.g. `2.0*femtoseconds`, `10.0/picosecond` or
//! `1.0*kilocalories_per_mole/angstrom**2`. Unit names accept plural forms and
//! an optional `unit.` prefix.

use phf::{Map, phf_map};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("Invalid quantity expression '{text}': {reason}")]
    Syntax { text: String, reason: String },

    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("'{0}' does not specify any unit")]
    MissingUnit(String),

    #[error("Unit '{found}' is not compatible with '{expected}'")]
    Incompatible { found: String, expected: String },

    #[error("Exponent of '{0}' is out of range")]
    ExponentOverflow(String),
}

/// Exponents over the base dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimensions {
    pub length: i8,
    pub mass: i8,
    pub time: i8,
    pub temperature: i8,
    pub amount: i8,
    pub current: i8,
    pub angle: i8,
}

impl Dimensions {
    pub const NONE: Dimensions = Dimensions {
        length: 0,
        mass: 0,
        time: 0,
        temperature: 0,
        amount: 0,
        current: 0,
        angle: 0,
    };
    pub const LENGTH: Dimensions = Dimensions {
        length: 1,
        ..Self::NONE
    };
    pub const MASS: Dimensions = Dimensions {
        mass: 1,
        ..Self::NONE
    };
    pub const TIME: Dimensions = Dimensions {
        time: 1,
        ..Self::NONE
    };
    pub const TEMPERATURE: Dimensions = Dimensions {
        temperature: 1,
        ..Self::NONE
    };
    pub const AMOUNT: Dimensions = Dimensions {
        amount: 1,
        ..Self::NONE
    };
    pub const ANGLE: Dimensions = Dimensions {
        angle: 1,
        ..Self::NONE
    };
    pub const CHARGE: Dimensions = Dimensions {
        current: 1,
        time: 1,
        ..Self::NONE
    };
    pub const ENERGY: Dimensions = Dimensions {
        mass: 1,
        length: 2,
        time: -2,
        ..Self::NONE
    };
    pub const MOLAR_ENERGY: Dimensions = Dimensions {
        mass: 1,
        length: 2,
        time: -2,
        amount: -1,
        ..Self::NONE
    };
    pub const PRESSURE: Dimensions = Dimensions {
        mass: 1,
        length: -1,
        time: -2,
        ..Self::NONE
    };

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::NONE
    }

    pub fn multiply(&self, other: &Dimensions) -> Option<Dimensions> {
        self.combine(other, 1)
    }

    pub fn divide(&self, other: &Dimensions) -> Option<Dimensions> {
        self.combine(other, -1)
    }

    /// Raises every exponent to `exponent`, or `None` if one leaves the `i8` range.
    pub fn pow(&self, exponent: i8) -> Option<Dimensions> {
        Some(Dimensions {
            length: self.length.checked_mul(exponent)?,
            mass: self.mass.checked_mul(exponent)?,
            time: self.time.checked_mul(exponent)?,
            temperature: self.temperature.checked_mul(exponent)?,
            amount: self.amount.checked_mul(exponent)?,
            current: self.current.checked_mul(exponent)?,
            angle: self.angle.checked_mul(exponent)?,
        })
    }

    fn combine(&self, other: &Dimensions, sign: i8) -> Option<Dimensions> {
        let add = |a: i8, b: i8| b.checked_mul(sign).and_then(|b| a.checked_add(b));
        Some(Dimensions {
            length: add(self.length, other.length)?,
            mass: add(self.mass, other.mass)?,
            time: add(self.time, other.time)?,
            temperature: add(self.temperature, other.temperature)?,
            amount: add(self.amount, other.amount)?,
            current: add(self.current, other.current)?,
            angle: add(self.angle, other.angle)?,
        })
    }
}

/// A named unit from the built-in table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDef {
    pub symbol: &'static str,
    pub dims: Dimensions,
    pub scale: f64,
}

pub const METER: UnitDef = UnitDef {
    symbol: "meter",
    dims: Dimensions::LENGTH,
    scale: 1.0,
};
pub const CENTIMETER: UnitDef = UnitDef {
    symbol: "centimeter",
    dims: Dimensions::LENGTH,
    scale: 1e-2,
};
pub const NANOMETER: UnitDef = UnitDef {
    symbol: "nanometer",
    dims: Dimensions::LENGTH,
    scale: 1e-9,
};
pub const ANGSTROM: UnitDef = UnitDef {
    symbol: "angstrom",
    dims: Dimensions::LENGTH,
    scale: 1e-10,
};
pub const PICOMETER: UnitDef = UnitDef {
    symbol: "picometer",
    dims: Dimensions::LENGTH,
    scale: 1e-12,
};
pub const SECOND: UnitDef = UnitDef {
    symbol: "second",
    dims: Dimensions::TIME,
    scale: 1.0,
};
pub const NANOSECOND: UnitDef = UnitDef {
    symbol: "nanosecond",
    dims: Dimensions::TIME,
    scale: 1e-9,
};
pub const PICOSECOND: UnitDef = UnitDef {
    symbol: "picosecond",
    dims: Dimensions::TIME,
    scale: 1e-12,
};
pub const FEMTOSECOND: UnitDef = UnitDef {
    symbol: "femtosecond",
    dims: Dimensions::TIME,
    scale: 1e-15,
};
pub const KELVIN: UnitDef = UnitDef {
    symbol: "kelvin",
    dims: Dimensions::TEMPERATURE,
    scale: 1.0,
};
pub const KILOGRAM: UnitDef = UnitDef {
    symbol: "kilogram",
    dims: Dimensions::MASS,
    scale: 1.0,
};
pub const GRAM: UnitDef = UnitDef {
    symbol: "gram",
    dims: Dimensions::MASS,
    scale: 1e-3,
};
pub const DALTON: UnitDef = UnitDef {
    symbol: "dalton",
    dims: Dimensions::MASS,
    scale: 1.660_539_066_60e-27,
};
pub const MOLE: UnitDef = UnitDef {
    symbol: "mole",
    dims: Dimensions::AMOUNT,
    scale: 1.0,
};
pub const JOULE: UnitDef = UnitDef {
    symbol: "joule",
    dims: Dimensions::ENERGY,
    scale: 1.0,
};
pub const KILOJOULE: UnitDef = UnitDef {
    symbol: "kilojoule",
    dims: Dimensions::ENERGY,
    scale: 1e3,
};
pub const CALORIE: UnitDef = UnitDef {
    symbol: "calorie",
    dims: Dimensions::ENERGY,
    scale: 4.184,
};
pub const KILOCALORIE: UnitDef = UnitDef {
    symbol: "kilocalorie",
    dims: Dimensions::ENERGY,
    scale: 4184.0,
};
pub const KILOJOULE_PER_MOLE: UnitDef = UnitDef {
    symbol: "kilojoule_per_mole",
    dims: Dimensions::MOLAR_ENERGY,
    scale: 1e3,
};
pub const KILOCALORIE_PER_MOLE: UnitDef = UnitDef {
    symbol: "kilocalorie_per_mole",
    dims: Dimensions::MOLAR_ENERGY,
    scale: 4184.0,
};
pub const PASCAL: UnitDef = UnitDef {
    symbol: "pascal",
    dims: Dimensions::PRESSURE,
    scale: 1.0,
};
pub const BAR: UnitDef = UnitDef {
    symbol: "bar",
    dims: Dimensions::PRESSURE,
    scale: 1e5,
};
pub const ATMOSPHERE: UnitDef = UnitDef {
    symbol: "atmosphere",
    dims: Dimensions::PRESSURE,
    scale: 101_325.0,
};
pub const RADIAN: UnitDef = UnitDef {
    symbol: "radian",
    dims: Dimensions::ANGLE,
    scale: 1.0,
};
pub const DEGREE: UnitDef = UnitDef {
    symbol: "degree",
    dims: Dimensions::ANGLE,
    scale: std::f64::consts::PI / 180.0,
};
pub const ELEMENTARY_CHARGE: UnitDef = UnitDef {
    symbol: "elementary_charge",
    dims: Dimensions::CHARGE,
    scale: 1.602_176_634e-19,
};

static UNITS: Map<&'static str, UnitDef> = phf_map! {
    "meter" => METER, "metre" => METER,
    "centimeter" => CENTIMETER, "centimetre" => CENTIMETER,
    "nanometer" => NANOMETER, "nanometre" => NANOMETER,
    "angstrom" => ANGSTROM,
    "picometer" => PICOMETER, "picometre" => PICOMETER,
    "second" => SECOND,
    "nanosecond" => NANOSECOND,
    "picosecond" => PICOSECOND,
    "femtosecond" => FEMTOSECOND,
    "kelvin" => KELVIN,
    "kilogram" => KILOGRAM,
    "gram" => GRAM,
    "dalton" => DALTON, "amu" => DALTON,
    "mole" => MOLE,
    "joule" => JOULE,
    "kilojoule" => KILOJOULE,
    "calorie" => CALORIE,
    "kilocalorie" => KILOCALORIE,
    "kilojoule_per_mole" => KILOJOULE_PER_MOLE, "kilojoules_per_mole" => KILOJOULE_PER_MOLE,
    "kilocalorie_per_mole" => KILOCALORIE_PER_MOLE, "kilocalories_per_mole" => KILOCALORIE_PER_MOLE,
    "pascal" => PASCAL,
    "bar" => BAR,
    "atmosphere" => ATMOSPHERE,
    "radian" => RADIAN,
    "degree" => DEGREE,
    "elementary_charge" => ELEMENTARY_CHARGE,
};

fn lookup(name: &str) -> Option<UnitDef> {
    let name = name.strip_prefix("unit.").unwrap_or(name);
    UNITS
        .get(name)
        .or_else(|| name.strip_suffix('s').and_then(|singular| UNITS.get(singular)))
        .copied()
}

/// A (possibly compound) unit such as `kilojoule_per_mole/nanometer**2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    factors: Vec<(&'static str, i8)>,
    dims: Dimensions,
    scale: f64,
}

impl Unit {
    pub fn dimensionless() -> Self {
        Self {
            factors: Vec::new(),
            dims: Dimensions::NONE,
            scale: 1.0,
        }
    }

    /// Looks up a single named unit, accepting plurals and a `unit.` prefix.
    pub fn named(name: &str) -> Option<Unit> {
        lookup(name).map(Unit::from)
    }

    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dims.is_dimensionless()
    }

    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dims == other.dims
    }

    pub fn multiply(&self, other: &Unit) -> Result<Unit, UnitError> {
        let mut factors = self.factors.clone();
        for &(symbol, exponent) in &other.factors {
            merge_factor(&mut factors, symbol, exponent)?;
        }
        let dims = self
            .dims
            .multiply(&other.dims)
            .ok_or_else(|| UnitError::ExponentOverflow(format!("{}*{}", self, other)))?;
        Ok(Unit {
            factors,
            dims,
            scale: self.scale * other.scale,
        })
    }

    pub fn divide(&self, other: &Unit) -> Result<Unit, UnitError> {
        self.multiply(&other.powi(-1)?)
    }

    pub fn powi(&self, exponent: i8) -> Result<Unit, UnitError> {
        let overflow = || UnitError::ExponentOverflow(format!("({})**{}", self, exponent));
        let factors = self
            .factors
            .iter()
            .filter(|_| exponent != 0)
            .map(|&(symbol, e)| e.checked_mul(exponent).map(|e| (symbol, e)))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(overflow)?;
        Ok(Unit {
            factors,
            dims: self.dims.pow(exponent).ok_or_else(overflow)?,
            scale: self.scale.powi(exponent as i32),
        })
    }

    fn numerator(&self) -> String {
        self.render(|e| e > 0, "*")
    }

    fn denominator(&self) -> String {
        self.render(|e| e < 0, "/")
    }

    fn render(&self, keep: impl Fn(i8) -> bool, separator: &str) -> String {
        self.factors
            .iter()
            .filter(|&&(_, e)| keep(e))
            .map(|&(symbol, e)| match e.abs() {
                1 => symbol.to_string(),
                n => format!("{}**{}", symbol, n),
            })
            .collect::<Vec<_>>()
            .join(separator)
    }
}

fn merge_factor(
    factors: &mut Vec<(&'static str, i8)>,
    symbol: &'static str,
    exponent: i8,
) -> Result<(), UnitError> {
    if let Some(pos) = factors.iter().position(|&(s, _)| s == symbol) {
        factors[pos].1 = factors[pos]
            .1
            .checked_add(exponent)
            .ok_or_else(|| UnitError::ExponentOverflow(symbol.to_string()))?;
        if factors[pos].1 == 0 {
            factors.remove(pos);
        }
    } else if exponent != 0 {
        factors.push((symbol, exponent));
    }
    Ok(())
}

impl From<UnitDef> for Unit {
    fn from(def: UnitDef) -> Self {
        Unit {
            factors: vec![(def.symbol, 1)],
            dims: def.dims,
            scale: def.scale,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numerator = self.numerator();
        let denominator = self.denominator();
        match (numerator.is_empty(), denominator.is_empty()) {
            (true, true) => f.write_str("dimensionless"),
            (false, true) => f.write_str(&numerator),
            (true, false) => write!(f, "1/{}", denominator),
            (false, false) => write!(f, "{}/{}", numerator, denominator),
        }
    }
}

/// A numeric value paired with a physical unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    value: f64,
    unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: impl Into<Unit>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn is_compatible(&self, unit: &Unit) -> bool {
        self.unit.is_compatible(unit)
    }

    /// Expresses the quantity in `unit`, failing for incompatible dimensions.
    pub fn value_in(&self, unit: &Unit) -> Result<f64, UnitError> {
        if !self.is_compatible(unit) {
            return Err(UnitError::Incompatible {
                found: self.unit.to_string(),
                expected: unit.to_string(),
            });
        }
        Ok(self.value * self.unit.scale / unit.scale)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numerator = self.unit.numerator();
        let denominator = self.unit.denominator();
        write!(f, "{:?}", self.value)?;
        if !numerator.is_empty() {
            write!(f, "*{}", numerator)?;
        }
        if !denominator.is_empty() {
            write!(f, "/{}", denominator)?;
        }
        Ok(())
    }
}

/// Parses a quantity expression such as `1.0*kilocalories_per_mole/angstrom**2`.
///
/// When `compatible_units` is given, the parsed unit must share its
/// dimensions. Expressions that contain no unit at all are rejected.
pub fn parse_quantity(text: &str, compatible_units: Option<&Unit>) -> Result<Quantity, UnitError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        text,
        tokens: &tokens,
        pos: 0,
    };
    let term = parser.expression()?;
    if parser.pos != tokens.len() {
        return Err(parser.syntax("unexpected trailing input"));
    }
    if !term.has_unit {
        return Err(UnitError::MissingUnit(text.to_string()));
    }
    if let Some(expected) = compatible_units {
        if !term.unit.is_compatible(expected) {
            return Err(UnitError::Incompatible {
                found: term.unit.to_string(),
                expected: expected.to_string(),
            });
        }
    }
    Ok(Quantity {
        value: term.magnitude,
        unit: term.unit,
    })
}

/// Best-effort variant of [`parse_quantity`] without unit constraints.
pub fn try_parse_quantity(text: &str) -> Option<Quantity> {
    parse_quantity(text, None).ok()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Star,
    Pow,
    Slash,
    Plus,
    Minus,
    LParen,
    RParen,
}

fn tokenize(text: &str) -> Result<Vec<Token>, UnitError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let syntax = |reason: String| UnitError::Syntax {
        text: text.to_string(),
        reason,
    };

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Pow);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| syntax(format!("invalid number '{}'", literal)))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(syntax(format!("unexpected character '{}'", other))),
        }
    }
    Ok(tokens)
}

struct Term {
    magnitude: f64,
    unit: Unit,
    has_unit: bool,
}

struct Parser<'a> {
    text: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn syntax(&self, reason: &str) -> UnitError {
        UnitError::Syntax {
            text: self.text.to_string(),
            reason: reason.to_string(),
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expression(&mut self) -> Result<Term, UnitError> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    lhs = Term {
                        magnitude: lhs.magnitude * rhs.magnitude,
                        unit: lhs.unit.multiply(&rhs.unit)?,
                        has_unit: lhs.has_unit || rhs.has_unit,
                    };
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    lhs = Term {
                        magnitude: lhs.magnitude / rhs.magnitude,
                        unit: lhs.unit.divide(&rhs.unit)?,
                        has_unit: lhs.has_unit || rhs.has_unit,
                    };
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn unary(&mut self) -> Result<Term, UnitError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                let mut term = self.unary()?;
                term.magnitude = -term.magnitude;
                Ok(term)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Term, UnitError> {
        let base = self.atom()?;
        if self.peek() != Some(&Token::Pow) {
            return Ok(base);
        }
        self.pos += 1;
        let negative = match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                true
            }
            Some(Token::Plus) => {
                self.pos += 1;
                false
            }
            _ => false,
        };
        let exponent = match self.next() {
            Some(Token::Number(n)) if n.fract() == 0.0 && n.abs() <= i8::MAX as f64 => *n as i8,
            _ => return Err(self.syntax("exponent must be a small integer")),
        };
        let exponent = if negative { -exponent } else { exponent };
        Ok(Term {
            magnitude: base.magnitude.powi(exponent as i32),
            unit: base.unit.powi(exponent)?,
            has_unit: base.has_unit,
        })
    }

    fn atom(&mut self) -> Result<Term, UnitError> {
        match self.next().cloned() {
            Some(Token::Number(n)) => Ok(Term {
                magnitude: n,
                unit: Unit::dimensionless(),
                has_unit: false,
            }),
            Some(Token::Ident(name)) => {
                let unit = Unit::named(&name).ok_or(UnitError::UnknownUnit(name))?;
                Ok(Term {
                    magnitude: 1.0,
                    unit,
                    has_unit: true,
                })
            }
            Some(Token::LParen) => {
                let inner = self.expression()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.syntax("missing closing parenthesis")),
                }
            }
            _ => Err(self.syntax("expected a number, unit or '('")),
        }
    }
}
