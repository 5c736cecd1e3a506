// UCUM Parser and Standards Converter
//
// Parser for Unified Code for Units of Measure (UCUM) strings, the
// healthcare standard adopted by LOINC, HL7, and DICOM, plus the
// dimensional converter built on it.
//
// ## UCUM Syntax Overview
//
// - Base units: m, g, s, mol
// - Prefixes: k (kilo), m (milli), u (micro), n (nano), etc.
// - Operators: . (multiply), / (divide), trailing integer exponent (m2)
// - Annotations: {text} for semantic clarification, ignored for math
// - Special atoms in brackets: [iU] for International Units
//
// Unlike the reference UCUM grammar, this parser operates on *normalized*
// codes (see `normalize`): everything is lowercase and micro signs are
// already folded to `u`. The registry is keyed accordingly.
//
// International Units deliberately do not convert across different codes
// here, even when the dimension matches: activity calibration is
// assay-specific. The resolver's simple-math table owns the spelling
// aliases that are actually safe (mIU/mL vs [iU]/L).

use std::collections::HashMap;
use std::fmt;

use super::dimension::Dimension;
use super::normalize::normalize;

/// UCUM prefix with its factor
#[derive(Debug, Clone, Copy)]
pub struct UcumPrefix {
    pub symbol: &'static str,
    pub factor: f64,
}

impl UcumPrefix {
    const fn new(symbol: &'static str, factor: f64) -> Self {
        UcumPrefix { symbol, factor }
    }
}

/// Prefixes seen on lab units. Longest-match is irrelevant here because
/// all symbols are single characters after normalization.
pub const UCUM_PREFIXES: &[UcumPrefix] = &[
    UcumPrefix::new("k", 1e3),
    UcumPrefix::new("d", 1e-1),
    UcumPrefix::new("c", 1e-2),
    UcumPrefix::new("m", 1e-3),
    UcumPrefix::new("u", 1e-6),
    UcumPrefix::new("n", 1e-9),
    UcumPrefix::new("p", 1e-12),
    UcumPrefix::new("f", 1e-15),
];

/// Token from the UCUM lexer
#[derive(Debug, Clone, PartialEq)]
pub enum UcumToken {
    /// Unit atom, including bracketed special atoms
    Unit(String),
    /// Annotation in braces
    Annotation(String),
    /// Multiplication operator (.)
    Dot,
    /// Division operator (/)
    Slash,
    /// Integer exponent
    Exponent(i8),
    /// End of input
    Eof,
}

/// UCUM lexer over a normalized code
pub struct UcumLexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> UcumLexer<'a> {
    pub fn new(input: &'a str) -> Self {
        UcumLexer { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_while<F: Fn(char) -> bool>(&mut self, predicate: F) {
        while let Some(c) = self.peek() {
            if predicate(c) {
                self.advance();
            } else {
                break;
            }
        }
    }

    pub fn next_token(&mut self) -> Result<UcumToken, UcumParseError> {
        match self.peek() {
            None => Ok(UcumToken::Eof),
            Some('.') => {
                self.advance();
                Ok(UcumToken::Dot)
            }
            Some('/') => {
                self.advance();
                Ok(UcumToken::Slash)
            }
            Some('{') => {
                self.advance();
                let start = self.pos;
                self.skip_while(|c| c != '}');
                let annotation = self.input[start..self.pos].to_string();
                if self.peek() == Some('}') {
                    self.advance();
                }
                Ok(UcumToken::Annotation(annotation))
            }
            Some('[') => {
                // Special atom like [iu]
                self.advance();
                let start = self.pos;
                self.skip_while(|c| c != ']');
                let unit = self.input[start..self.pos].to_string();
                if self.peek() == Some(']') {
                    self.advance();
                }
                Ok(UcumToken::Unit(format!("[{}]", unit)))
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => {
                let start = self.pos;
                if c == '-' || c == '+' {
                    self.advance();
                }
                self.skip_while(|c| c.is_ascii_digit());
                let num_str = &self.input[start..self.pos];
                let exp: i8 = num_str
                    .parse()
                    .map_err(|_| UcumParseError::InvalidExponent(num_str.to_string()))?;
                Ok(UcumToken::Exponent(exp))
            }
            Some(c) if c.is_alphabetic() || c == '%' => {
                let start = self.pos;
                self.advance();
                // Trailing digits are exponents (m2), not part of the atom
                self.skip_while(|c| c.is_alphabetic());
                let text = self.input[start..self.pos].to_string();
                Ok(UcumToken::Unit(text))
            }
            Some(c) => Err(UcumParseError::UnexpectedChar(c)),
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<UcumToken>, UcumParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token == UcumToken::Eof {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

/// UCUM parse error
#[derive(Debug, Clone, PartialEq)]
pub enum UcumParseError {
    UnexpectedChar(char),
    UnknownUnit(String),
    InvalidExponent(String),
    EmptyInput,
}

impl fmt::Display for UcumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UcumParseError::UnexpectedChar(c) => write!(f, "Unexpected character: '{}'", c),
            UcumParseError::UnknownUnit(u) => write!(f, "Unknown UCUM unit: '{}'", u),
            UcumParseError::InvalidExponent(e) => write!(f, "Invalid exponent: '{}'", e),
            UcumParseError::EmptyInput => write!(f, "Empty unit string"),
        }
    }
}

impl std::error::Error for UcumParseError {}

/// A single term in a UCUM expression
#[derive(Debug, Clone)]
pub struct UnitTerm {
    /// Prefix symbol (e.g. "m" for milli)
    pub prefix: Option<String>,
    /// Unit atom code
    pub unit: String,
    /// Exponent (negative for denominator terms)
    pub exponent: i8,
}

/// Parsed UCUM expression
#[derive(Debug, Clone, Default)]
pub struct ParsedUnit {
    /// Component terms (denominator terms carry negative exponents)
    pub terms: Vec<UnitTerm>,
    /// Optional annotation; never affects dimension or factor
    pub annotation: Option<String>,
}

impl ParsedUnit {
    /// Reduce to a dimension vector
    pub fn to_dimension(&self, registry: &UcumRegistry) -> Result<Dimension, UcumParseError> {
        let mut dim = Dimension::dimensionless();
        for term in &self.terms {
            let base_dim = registry.get_dimension(&term.unit)?;
            dim = dim * base_dim.pow(term.exponent);
        }
        Ok(dim)
    }

    /// Reduce to a conversion factor relative to base units
    pub fn to_factor(&self, registry: &UcumRegistry) -> Result<f64, UcumParseError> {
        let mut factor = 1.0;
        for term in &self.terms {
            let (base_factor, prefix_factor) =
                registry.get_factors(&term.unit, term.prefix.as_deref())?;
            factor *= (base_factor * prefix_factor).powi(term.exponent as i32);
        }
        Ok(factor)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Registry of known unit atoms, keyed by normalized (lowercase) code.
pub struct UcumRegistry {
    /// atom code -> (dimension, factor to base)
    atoms: HashMap<String, (Dimension, f64)>,
    /// prefix symbol -> factor
    prefixes: HashMap<String, f64>,
}

impl UcumRegistry {
    pub fn new() -> Self {
        use super::dimension::standard::*;

        let mut atoms: HashMap<String, (Dimension, f64)> = HashMap::new();

        // Dimensionless
        atoms.insert("1".to_string(), (dimensionless(), 1.0));
        atoms.insert("%".to_string(), (dimensionless(), 0.01));

        // Base atoms (UCUM conventions: gram, not kilogram)
        atoms.insert("m".to_string(), (length(), 1.0));
        atoms.insert("g".to_string(), (mass(), 1.0));
        atoms.insert("s".to_string(), (time(), 1.0));
        atoms.insert("mol".to_string(), (amount(), 1.0));

        // International Units, bracketed and bare spellings
        atoms.insert("[iu]".to_string(), (international_unit(), 1.0));
        atoms.insert("iu".to_string(), (international_unit(), 1.0));

        // Volume (L = dm³)
        atoms.insert("l".to_string(), (volume(), 1e-3));

        // Time
        atoms.insert("min".to_string(), (time(), 60.0));
        atoms.insert("h".to_string(), (time(), 3600.0));
        atoms.insert("d".to_string(), (time(), 86400.0));
        atoms.insert("wk".to_string(), (time(), 604800.0));

        // mEq is intentionally NOT registered: the equivalence to mmol
        // holds only for monovalent ions and is owned by the simple-math
        // table, not the standards layer.

        let mut prefixes = HashMap::new();
        for prefix in UCUM_PREFIXES {
            prefixes.insert(prefix.symbol.to_string(), prefix.factor);
        }

        UcumRegistry { atoms, prefixes }
    }

    pub fn get_dimension(&self, code: &str) -> Result<Dimension, UcumParseError> {
        self.atoms
            .get(code)
            .map(|(dim, _)| dim.clone())
            .ok_or_else(|| UcumParseError::UnknownUnit(code.to_string()))
    }

    pub fn get_factors(
        &self,
        code: &str,
        prefix: Option<&str>,
    ) -> Result<(f64, f64), UcumParseError> {
        let base_factor = self
            .atoms
            .get(code)
            .map(|(_, f)| *f)
            .ok_or_else(|| UcumParseError::UnknownUnit(code.to_string()))?;

        let prefix_factor = match prefix {
            Some(p) => *self
                .prefixes
                .get(p)
                .ok_or_else(|| UcumParseError::UnknownUnit(p.to_string()))?,
            None => 1.0,
        };

        Ok((base_factor, prefix_factor))
    }

    pub fn is_valid_atom(&self, code: &str) -> bool {
        self.atoms.contains_key(code)
    }
}

impl Default for UcumRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Parser
// =============================================================================

/// UCUM parser over normalized codes
pub struct UcumParser {
    registry: UcumRegistry,
}

impl UcumParser {
    pub fn new() -> Self {
        UcumParser {
            registry: UcumRegistry::new(),
        }
    }

    pub fn registry(&self) -> &UcumRegistry {
        &self.registry
    }

    /// Parse a unit code (normalizing it first) into a ParsedUnit
    pub fn parse(&self, input: &str) -> Result<ParsedUnit, UcumParseError> {
        let normalized = normalize(input);
        if normalized.is_empty() {
            return Err(UcumParseError::EmptyInput);
        }

        let mut lexer = UcumLexer::new(&normalized);
        let tokens = lexer.tokenize()?;
        self.parse_tokens(&tokens)
    }

    fn parse_tokens(&self, tokens: &[UcumToken]) -> Result<ParsedUnit, UcumParseError> {
        let mut result = ParsedUnit::default();
        let mut in_denominator = false;
        let mut i = 0;

        while i < tokens.len() {
            match &tokens[i] {
                UcumToken::Unit(code) => {
                    let (prefix, unit_code) = self.split_prefix_unit(code)?;
                    let exponent = if let Some(UcumToken::Exponent(e)) = tokens.get(i + 1) {
                        i += 1;
                        *e
                    } else {
                        1
                    };

                    let final_exp = if in_denominator { -exponent } else { exponent };
                    result.terms.push(UnitTerm {
                        prefix,
                        unit: unit_code,
                        exponent: final_exp,
                    });
                }
                UcumToken::Dot => {
                    // Multiplication - stay in current mode
                }
                UcumToken::Slash => {
                    in_denominator = true;
                }
                UcumToken::Annotation(ann) => {
                    result.annotation = Some(ann.clone());
                }
                UcumToken::Exponent(_) => {
                    // A bare leading exponent is the unity atom ("1")
                }
                UcumToken::Eof => break,
            }
            i += 1;
        }

        Ok(result)
    }

    /// Split a unit atom into prefix and base atom
    fn split_prefix_unit(&self, code: &str) -> Result<(Option<String>, String), UcumParseError> {
        // Bracketed special atoms have no prefix
        if code.starts_with('[') {
            if self.registry.is_valid_atom(code) {
                return Ok((None, code.to_string()));
            }
            return Err(UcumParseError::UnknownUnit(code.to_string()));
        }

        // Whole code as atom wins over prefix splitting ("mol", "min")
        if self.registry.is_valid_atom(code) {
            return Ok((None, code.to_string()));
        }

        for prefix in UCUM_PREFIXES {
            if let Some(rest) = code.strip_prefix(prefix.symbol) {
                if self.registry.is_valid_atom(rest) {
                    return Ok((Some(prefix.symbol.to_string()), rest.to_string()));
                }
            }
        }

        Err(UcumParseError::UnknownUnit(code.to_string()))
    }
}

impl Default for UcumParser {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Standards Converter
// =============================================================================

/// Factor converting one unit code into another via UCUM dimensional
/// analysis. `None` when either code fails to parse, the dimensions
/// differ, or the International Unit dimension participates with
/// differing codes (activity is calibration-defined; spelling aliases
/// are the simple-math table's business).
pub fn ucum_factor(from: &str, to: &str) -> Option<f64> {
    let parser = UcumParser::new();
    let parsed_from = parser.parse(from).ok()?;
    let parsed_to = parser.parse(to).ok()?;

    // An annotation-only code ({titer}, {positive}) has no unit terms; it
    // is an opaque assay label, not dimensionless unity.
    if parsed_from.terms.is_empty() && parsed_from.annotation.is_some() {
        return None;
    }
    if parsed_to.terms.is_empty() && parsed_to.annotation.is_some() {
        return None;
    }

    let registry = parser.registry();
    let dim_from = parsed_from.to_dimension(registry).ok()?;
    let dim_to = parsed_to.to_dimension(registry).ok()?;

    if dim_from != dim_to {
        return None;
    }
    if dim_from.contains_iu() && normalize(from) != normalize(to) {
        return None;
    }

    let factor_from = parsed_from.to_factor(registry).ok()?;
    let factor_to = parsed_to.to_factor(registry).ok()?;
    Some(factor_from / factor_to)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9 * b.abs().max(1.0), "{} vs {}", a, b);
    }

    #[test]
    fn test_lexer_simple() {
        let mut lexer = UcumLexer::new("mg");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens, vec![UcumToken::Unit("mg".to_string())]);
    }

    #[test]
    fn test_lexer_compound() {
        let mut lexer = UcumLexer::new("mg/dl");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1], UcumToken::Slash);
    }

    #[test]
    fn test_lexer_exponent_splits_from_atom() {
        let mut lexer = UcumLexer::new("m2");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![UcumToken::Unit("m".to_string()), UcumToken::Exponent(2)]
        );
    }

    #[test]
    fn test_lexer_annotation_and_special() {
        let mut lexer = UcumLexer::new("mol/l{creatinine}");
        let tokens = lexer.tokenize().unwrap();
        assert!(tokens
            .iter()
            .any(|t| matches!(t, UcumToken::Annotation(a) if a == "creatinine")));

        let mut lexer = UcumLexer::new("[iu]/l");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0], UcumToken::Unit("[iu]".to_string()));
    }

    #[test]
    fn test_parser_prefix_split() {
        let parser = UcumParser::new();
        let parsed = parser.parse("mg").unwrap();
        assert_eq!(parsed.terms.len(), 1);
        assert_eq!(parsed.terms[0].prefix, Some("m".to_string()));
        assert_eq!(parsed.terms[0].unit, "g");

        // "mol" and "min" are atoms, not prefixed codes
        let parsed = parser.parse("mol").unwrap();
        assert_eq!(parsed.terms[0].prefix, None);
        let parsed = parser.parse("min").unwrap();
        assert_eq!(parsed.terms[0].prefix, None);
    }

    #[test]
    fn test_parser_denominator_exponents() {
        let parser = UcumParser::new();
        let parsed = parser.parse("mg/dL").unwrap();
        assert_eq!(parsed.terms[0].exponent, 1);
        assert_eq!(parsed.terms[1].exponent, -1);
    }

    #[test]
    fn test_parser_unknown_unit() {
        let parser = UcumParser::new();
        assert!(parser.parse("bogus").is_err());
        assert!(parser.parse("").is_err());
    }

    #[test]
    fn test_factor_mass_concentration() {
        // mg/dL -> g/L: 1 mg/dL = 0.01 g/L
        assert_close(ucum_factor("mg/dL", "g/L").unwrap(), 0.01);
        // ug/mL == mg/L
        assert_close(ucum_factor("ug/mL", "mg/L").unwrap(), 1.0);
        // ng/mL == ug/L
        assert_close(ucum_factor("ng/mL", "ug/L").unwrap(), 1.0);
    }

    #[test]
    fn test_factor_molar() {
        assert_close(ucum_factor("mmol/L", "umol/L").unwrap(), 1000.0);
        assert_close(ucum_factor("nmol/L", "pmol/mL").unwrap(), 1.0);
    }

    #[test]
    fn test_factor_percent_to_unity() {
        assert_close(ucum_factor("%", "1").unwrap(), 0.01);
    }

    #[test]
    fn test_factor_dimension_mismatch() {
        // Mass vs molar concentration needs stoichiometry, not UCUM
        assert!(ucum_factor("mg/dL", "mmol/L").is_none());
        assert!(ucum_factor("mg", "s").is_none());
    }

    #[test]
    fn test_factor_opaque_annotation_only() {
        assert!(ucum_factor("{titer}", "%").is_none());
        assert!(ucum_factor("{positive}", "1").is_none());
        // A real unit carrying an annotation still converts
        assert_close(ucum_factor("mol/L{creatinine}", "mmol/L").unwrap(), 1000.0);
    }

    #[test]
    fn test_factor_iu_not_interconvertible() {
        // Same dimension, but activity codes only convert to themselves
        assert!(ucum_factor("mIU/mL", "[iU]/L").is_none());
        assert!(ucum_factor("[iU]/L", "mIU/L").is_none());
    }
}
