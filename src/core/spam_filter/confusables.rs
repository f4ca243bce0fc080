// Look-alike characters folded to plain Latin before names are compared.
//
// Every cased letter listed here is listed in both cases. Normalization
// lowercases *after* folding, so a mapped lowercase letter with an unmapped
// uppercase twin would fold differently on a second pass.
//
// Compatibility forms (fullwidth letters, ligatures like `ﬁ` or `Ĳ`) are not
// listed. NFKC runs before the table is consulted and already reduces them.

use std::collections::HashMap;

const ENTRIES: &[(char, &str)] = &[
    // Greek
    ('Α', "a"), ('α', "a"), ('Ά', "a"), ('ά', "a"),
    ('Β', "b"), ('β', "b"),
    ('Γ', "r"), ('γ', "y"),
    ('Δ', "a"), ('δ', "d"),
    ('Ε', "e"), ('ε', "e"), ('Έ', "e"), ('έ', "e"),
    ('Ζ', "z"), ('ζ', "z"),
    ('Η', "h"), ('η', "n"), ('Ή', "h"), ('ή', "n"),
    ('Θ', "o"), ('θ', "o"),
    ('Ι', "i"), ('ι', "i"), ('Ί', "i"), ('ί', "i"), ('Ϊ', "i"), ('ϊ', "i"), ('ΐ', "i"),
    ('Κ', "k"), ('κ', "k"),
    ('Λ', "a"), ('λ', "a"),
    ('Μ', "m"), ('μ', "u"),
    ('Ν', "n"), ('ν', "v"),
    ('Ο', "o"), ('ο', "o"), ('Ό', "o"), ('ό', "o"),
    ('Π', "n"), ('π', "n"),
    ('Ρ', "p"), ('ρ', "p"),
    ('Σ', "e"), ('σ', "o"), ('ς', "c"),
    ('Τ', "t"), ('τ', "t"),
    ('Υ', "y"), ('υ', "u"), ('Ύ', "y"), ('ύ', "u"), ('Ϋ', "y"), ('ϋ', "u"), ('ΰ', "u"),
    ('Φ', "o"), ('φ', "o"),
    ('Χ', "x"), ('χ', "x"),
    ('Ω', "o"), ('ω', "w"), ('Ώ', "o"), ('ώ', "w"),
    // Cyrillic
    ('А', "a"), ('а', "a"), ('Ӑ', "a"), ('ӑ', "a"), ('Ӓ', "a"), ('ӓ', "a"),
    ('В', "b"), ('в', "b"),
    ('Г', "r"), ('г', "r"),
    ('Ԁ', "d"), ('ԁ', "d"),
    ('Е', "e"), ('е', "e"), ('Ё', "e"), ('ё', "e"), ('Є', "e"), ('є', "e"),
    ('З', "3"), ('з', "3"),
    ('И', "n"), ('и', "u"),
    ('І', "i"), ('і', "i"), ('Ї', "i"), ('ї', "i"),
    ('Ј', "j"), ('ј', "j"),
    ('К', "k"), ('к', "k"),
    ('М', "m"), ('м', "m"),
    ('Н', "h"), ('н', "h"),
    ('О', "o"), ('о', "o"), ('Ӧ', "o"), ('ӧ', "o"),
    ('П', "n"), ('п', "n"),
    ('Р', "p"), ('р', "p"),
    ('С', "c"), ('с', "c"),
    ('Т', "t"), ('т', "t"),
    ('У', "y"), ('у', "y"), ('Ү', "y"), ('ү', "y"),
    ('Х', "x"), ('х', "x"),
    ('Ь', "b"), ('ь', "b"),
    ('Ѕ', "s"), ('ѕ', "s"),
    ('Һ', "h"), ('һ', "h"),
    ('Ԛ', "q"), ('ԛ', "q"),
    ('Ԝ', "w"), ('ԝ', "w"),
    // Latin-1 supplement
    ('À', "a"), ('Á', "a"), ('Â', "a"), ('Ã', "a"), ('Ä', "a"), ('Å', "a"),
    ('à', "a"), ('á', "a"), ('â', "a"), ('ã', "a"), ('ä', "a"), ('å', "a"),
    ('Æ', "ae"), ('æ', "ae"),
    ('Ç', "c"), ('ç', "c"),
    ('È', "e"), ('É', "e"), ('Ê', "e"), ('Ë', "e"),
    ('è', "e"), ('é', "e"), ('ê', "e"), ('ë', "e"),
    ('Ì', "i"), ('Í', "i"), ('Î', "i"), ('Ï', "i"),
    ('ì', "i"), ('í', "i"), ('î', "i"), ('ï', "i"),
    ('Ð', "d"), ('ð', "d"),
    ('Ñ', "n"), ('ñ', "n"),
    ('Ò', "o"), ('Ó', "o"), ('Ô', "o"), ('Õ', "o"), ('Ö', "o"), ('Ø', "o"),
    ('ò', "o"), ('ó', "o"), ('ô', "o"), ('õ', "o"), ('ö', "o"), ('ø', "o"),
    ('Ù', "u"), ('Ú', "u"), ('Û', "u"), ('Ü', "u"),
    ('ù', "u"), ('ú', "u"), ('û', "u"), ('ü', "u"),
    ('Ý', "y"), ('ý', "y"), ('Ÿ', "y"), ('ÿ', "y"),
    ('ẞ', "ss"), ('ß', "ss"),
    // Latin extended-A
    ('Ā', "a"), ('ā', "a"), ('Ă', "a"), ('ă', "a"), ('Ą', "a"), ('ą', "a"),
    ('Ć', "c"), ('ć', "c"), ('Ĉ', "c"), ('ĉ', "c"), ('Ċ', "c"), ('ċ', "c"), ('Č', "c"), ('č', "c"),
    ('Ď', "d"), ('ď', "d"), ('Đ', "d"), ('đ', "d"),
    ('Ē', "e"), ('ē', "e"), ('Ĕ', "e"), ('ĕ', "e"), ('Ė', "e"), ('ė', "e"),
    ('Ę', "e"), ('ę', "e"), ('Ě', "e"), ('ě', "e"),
    ('Ĝ', "g"), ('ĝ', "g"), ('Ğ', "g"), ('ğ', "g"), ('Ġ', "g"), ('ġ', "g"), ('Ģ', "g"), ('ģ', "g"),
    ('Ĥ', "h"), ('ĥ', "h"), ('Ħ', "h"), ('ħ', "h"),
    ('Ĩ', "i"), ('ĩ', "i"), ('Ī', "i"), ('ī', "i"), ('Ĭ', "i"), ('ĭ', "i"),
    ('Į', "i"), ('į', "i"), ('İ', "i"), ('ı', "i"),
    ('Ĵ', "j"), ('ĵ', "j"),
    ('Ķ', "k"), ('ķ', "k"), ('ĸ', "k"),
    ('Ĺ', "l"), ('ĺ', "l"), ('Ļ', "l"), ('ļ', "l"), ('Ľ', "l"), ('ľ', "l"),
    ('Ł', "l"), ('ł', "l"),
    ('Ń', "n"), ('ń', "n"), ('Ņ', "n"), ('ņ', "n"), ('Ň', "n"), ('ň', "n"), ('Ŋ', "n"), ('ŋ', "n"),
    ('Ō', "o"), ('ō', "o"), ('Ŏ', "o"), ('ŏ', "o"), ('Ő', "o"), ('ő', "o"),
    ('Œ', "oe"), ('œ', "oe"),
    ('Ŕ', "r"), ('ŕ', "r"), ('Ŗ', "r"), ('ŗ', "r"), ('Ř', "r"), ('ř', "r"),
    ('Ś', "s"), ('ś', "s"), ('Ŝ', "s"), ('ŝ', "s"), ('Ş', "s"), ('ş', "s"), ('Š', "s"), ('š', "s"),
    ('Ţ', "t"), ('ţ', "t"), ('Ť', "t"), ('ť', "t"), ('Ŧ', "t"), ('ŧ', "t"),
    ('Ũ', "u"), ('ũ', "u"), ('Ū', "u"), ('ū', "u"), ('Ŭ', "u"), ('ŭ', "u"),
    ('Ů', "u"), ('ů', "u"), ('Ű', "u"), ('ű', "u"), ('Ų', "u"), ('ų', "u"),
    ('Ŵ', "w"), ('ŵ', "w"),
    ('Ŷ', "y"), ('ŷ', "y"),
    ('Ź', "z"), ('ź', "z"), ('Ż', "z"), ('ż', "z"), ('Ž', "z"), ('ž', "z"),
    // Invisible joiners and variation selectors left behind by emoji
    ('\u{200B}', ""), ('\u{200C}', ""), ('\u{200D}', ""), ('\u{2060}', ""),
    ('\u{FEFF}', ""), ('\u{FE0E}', ""), ('\u{FE0F}', ""),
];

/// Immutable look-alike mapping shared by every evaluation.
///
/// Build it once at startup and hand it out behind an `Arc`; nothing mutates
/// it afterwards.
#[derive(Debug, Clone)]
pub struct ConfusableTable {
    map: HashMap<char, &'static str>,
}

impl ConfusableTable {
    pub fn new() -> Self {
        Self {
            map: ENTRIES.iter().copied().collect(),
        }
    }

    /// Plain-Latin replacement for `c`, if it is a known look-alike.
    pub fn get(&self, c: char) -> Option<&'static str> {
        self.map.get(&c).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

impl Default for ConfusableTable {
    fn default() -> Self {
        Self::new()
    }
}
