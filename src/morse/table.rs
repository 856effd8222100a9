use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{TrainerError, TrainerResult};

/// A single Morse code element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MorseUnit {
    Dot,  // 1 unit tone
    Dash, // 3 units tone
}

impl MorseUnit {
    /// Returns the tone length in units (1 unit = dot length)
    pub fn units(&self) -> u32 {
        match self {
            MorseUnit::Dot => 1,
            MorseUnit::Dash => 3,
        }
    }

    fn as_char(&self) -> char {
        match self {
            MorseUnit::Dot => '.',
            MorseUnit::Dash => '-',
        }
    }
}

/// The dot/dash sequence for one character. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CodeSymbol(Vec<MorseUnit>);

impl CodeSymbol {
    pub fn new(units: Vec<MorseUnit>) -> TrainerResult<Self> {
        if units.is_empty() {
            return Err(TrainerError::UnknownSymbol(String::new()));
        }
        Ok(Self(units))
    }

    pub fn units(&self) -> &[MorseUnit] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length of the character in units, including the gaps between its elements
    pub fn total_units(&self) -> u32 {
        let tones: u32 = self.0.iter().map(MorseUnit::units).sum();
        tones + self.0.len() as u32 - 1
    }
}

impl fmt::Display for CodeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for unit in &self.0 {
            write!(f, "{}", unit.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for CodeSymbol {
    type Err = TrainerError;

    /// Parse `.`/`-` text. Anything else is an unknown symbol.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let units = s
            .chars()
            .map(|c| match c {
                '.' => Ok(MorseUnit::Dot),
                '-' => Ok(MorseUnit::Dash),
                _ => Err(TrainerError::UnknownSymbol(s.to_string())),
            })
            .collect::<TrainerResult<Vec<_>>>()?;
        CodeSymbol::new(units).map_err(|_| TrainerError::UnknownSymbol(s.to_string()))
    }
}

/// Supported alphabets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alphabet {
    #[default]
    Latin,
    Cyrillic,
}

impl Alphabet {
    pub fn display_name(&self) -> &'static str {
        match self {
            Alphabet::Latin => "Latin",
            Alphabet::Cyrillic => "Cyrillic",
        }
    }

    /// Order in which characters are introduced to a new learner
    pub fn default_curriculum(&self) -> &'static str {
        match self {
            // Koch order
            Alphabet::Latin => "KMURESNAPTLWI.JZ=FOY,VG5/Q92H38B?47C1D60X",
            // Letters by frequency, then digits
            Alphabet::Cyrillic => "ОЕАИНТСРВЛКМДПУЯЫЬГЗБЧЙХЖШЮЦЩЭФЪ1234567890",
        }
    }

    pub fn default_words(&self) -> &'static [&'static str] {
        match self {
            Alphabet::Latin => &[
                "PARIS", "SOS", "CQ", "TEST", "QRZ", "RIG", "ANT", "WX", "NAME", "HOME", "RADIO",
                "MORSE", "CODE", "KEY", "SIGNAL", "TONE", "SPEED", "WORD", "POWER", "HELLO",
            ],
            Alphabet::Cyrillic => &[
                "СОС", "МАМА", "ПАПА", "ДОМ", "МОРЕ", "СОНЦЕ", "ВОДА", "ЗЕМЛЯ", "НЕБО", "ДЕРЕВО",
                "ПТАХ", "РЫБА", "АВТО", "ШКОЛА", "КНИГА", "СТЕНА", "ЛАМПА", "ГОРОД", "ПОЕЗД",
                "УЧЕНИК",
            ],
        }
    }

    fn definitions(&self) -> &'static [(char, &'static str)] {
        match self {
            Alphabet::Latin => LATIN,
            Alphabet::Cyrillic => CYRILLIC,
        }
    }
}

const LATIN: &[(char, &str)] = &[
    ('A', ".-"),
    ('B', "-..."),
    ('C', "-.-."),
    ('D', "-.."),
    ('E', "."),
    ('F', "..-."),
    ('G', "--."),
    ('H', "...."),
    ('I', ".."),
    ('J', ".---"),
    ('K', "-.-"),
    ('L', ".-.."),
    ('M', "--"),
    ('N', "-."),
    ('O', "---"),
    ('P', ".--."),
    ('Q', "--.-"),
    ('R', ".-."),
    ('S', "..."),
    ('T', "-"),
    ('U', "..-"),
    ('V', "...-"),
    ('W', ".--"),
    ('X', "-..-"),
    ('Y', "-.--"),
    ('Z', "--.."),
    ('0', "-----"),
    ('1', ".----"),
    ('2', "..---"),
    ('3', "...--"),
    ('4', "....-"),
    ('5', "....."),
    ('6', "-...."),
    ('7', "--..."),
    ('8', "---.."),
    ('9', "----."),
    ('.', ".-.-.-"),
    (',', "--..--"),
    ('?', "..--.."),
    ('/', "-..-."),
    ('=', "-...-"), // BT
    ('-', "-....-"),
    ('+', ".-.-."), // AR
    ('@', ".--.-."),
    (':', "---..."),
    ('\'', ".----."),
    ('(', "-.--."),
    (')', "-.--.-"),
    ('"', ".-..-."),
];

const CYRILLIC: &[(char, &str)] = &[
    ('А', ".-"),
    ('Б', "-..."),
    ('В', ".--"),
    ('Г', "--."),
    ('Д', "-.."),
    ('Е', "."),
    ('Ж', "...-"),
    ('З', "--.."),
    ('И', ".."),
    ('Й', ".---"),
    ('К', "-.-"),
    ('Л', ".-.."),
    ('М', "--"),
    ('Н', "-."),
    ('О', "---"),
    ('П', ".--."),
    ('Р', ".-."),
    ('С', "..."),
    ('Т', "-"),
    ('У', "..-"),
    ('Ф', "..-."),
    ('Х', "...."),
    ('Ц', "-.-."),
    ('Ч', "---."),
    ('Ш', "----"),
    ('Щ', "--.-"),
    ('Ъ', "--.--"),
    ('Ы', "-.--"),
    ('Ь', "-..-"),
    ('Э', "..-.."),
    ('Ю', "..--"),
    ('Я', ".-.-"),
    ('0', "-----"),
    ('1', ".----"),
    ('2', "..---"),
    ('3', "...--"),
    ('4', "....-"),
    ('5', "....."),
    ('6', "-...."),
    ('7', "--..."),
    ('8', "---.."),
    ('9', "----."),
    ('.', ".-.-.-"),
    (',', "--..--"),
    ('?', "..--.."),
    ('/', "-..-."),
    ('=', "-...-"),
    ('-', "-....-"),
    ('+', ".-.-."),
    ('@', ".--.-."),
    (':', "---..."),
    ('\'', ".----."),
    ('(', "-.--."),
    (')', "-.--.-"),
    ('"', ".-..-."),
];

/// Upper-case a character when that yields exactly one character
pub fn normalize(ch: char) -> char {
    let mut upper = ch.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => ch,
    }
}

/// Bidirectional character/symbol lookup for one alphabet
#[derive(Debug)]
pub struct CodeTable {
    alphabet: Alphabet,
    order: Vec<char>,
    by_char: HashMap<char, CodeSymbol>,
    by_symbol: HashMap<CodeSymbol, char>,
}

static LATIN_TABLE: OnceLock<CodeTable> = OnceLock::new();
static CYRILLIC_TABLE: OnceLock<CodeTable> = OnceLock::new();

impl CodeTable {
    /// Shared, immutable table for an alphabet. Built on first use.
    pub fn for_alphabet(alphabet: Alphabet) -> &'static CodeTable {
        let cell = match alphabet {
            Alphabet::Latin => &LATIN_TABLE,
            Alphabet::Cyrillic => &CYRILLIC_TABLE,
        };
        cell.get_or_init(|| CodeTable::build(alphabet))
    }

    fn build(alphabet: Alphabet) -> Self {
        let definitions = alphabet.definitions();
        let mut order = Vec::with_capacity(definitions.len());
        let mut by_char = HashMap::with_capacity(definitions.len());
        let mut by_symbol = HashMap::with_capacity(definitions.len());

        for &(ch, code) in definitions {
            // Table literals only hold '.' and '-'
            let units = code
                .chars()
                .map(|c| if c == '-' { MorseUnit::Dash } else { MorseUnit::Dot })
                .collect();
            let symbol = CodeSymbol(units);
            order.push(ch);
            by_char.insert(ch, symbol.clone());
            by_symbol.insert(symbol, ch);
        }

        Self {
            alphabet,
            order,
            by_char,
            by_symbol,
        }
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    /// Look up the symbol for a character (case-insensitive)
    pub fn encode(&self, ch: char) -> TrainerResult<&CodeSymbol> {
        self.by_char
            .get(&normalize(ch))
            .ok_or(TrainerError::UnsupportedCharacter(ch))
    }

    /// Look up the character for a symbol
    pub fn decode(&self, symbol: &CodeSymbol) -> TrainerResult<char> {
        self.by_symbol
            .get(symbol)
            .copied()
            .ok_or_else(|| TrainerError::UnknownSymbol(symbol.to_string()))
    }

    /// Decode `.`/`-` text
    pub fn decode_str(&self, code: &str) -> TrainerResult<char> {
        let symbol: CodeSymbol = code.parse()?;
        self.decode(&symbol)
    }

    pub fn contains(&self, ch: char) -> bool {
        self.by_char.contains_key(&normalize(ch))
    }

    /// Every supported character, in table order
    pub fn characters(&self) -> &[char] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
