// Request verbs accepted by the dispatcher

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP verb. Only GET and POST are routable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
}

impl Verb {
    pub const ALL: [Verb; 2] = [Verb::Get, Verb::Post];

    /// Map a raw request method. Method tokens are case-sensitive, so
    /// anything other than exactly `GET` or `POST` is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "GET" => Some(Verb::Get),
            "POST" => Some(Verb::Post),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Verb::Get => 0b01,
            Verb::Post => 0b10,
        }
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Configuration values are not method tokens; accept any case.
        Verb::parse(&s.trim().to_ascii_uppercase())
            .ok_or_else(|| format!("unsupported verb '{}'", s))
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of allowed verbs, used for the process default and per-handler overrides.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Verb>", into = "Vec<Verb>")]
pub struct VerbSet(u8);

impl VerbSet {
    pub const fn empty() -> Self {
        VerbSet(0)
    }

    pub fn all() -> Self {
        Verb::ALL.into_iter().collect()
    }

    pub fn only(verb: Verb) -> Self {
        VerbSet(verb.bit())
    }

    pub fn with(self, verb: Verb) -> Self {
        VerbSet(self.0 | verb.bit())
    }

    pub fn contains(&self, verb: Verb) -> bool {
        self.0 & verb.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Verb> + '_ {
        Verb::ALL.into_iter().filter(|v| self.contains(*v))
    }
}

impl Default for VerbSet {
    fn default() -> Self {
        VerbSet::all()
    }
}

impl FromIterator<Verb> for VerbSet {
    fn from_iter<I: IntoIterator<Item = Verb>>(iter: I) -> Self {
        iter.into_iter().fold(VerbSet::empty(), VerbSet::with)
    }
}

impl From<Vec<Verb>> for VerbSet {
    fn from(verbs: Vec<Verb>) -> Self {
        verbs.into_iter().collect()
    }
}

impl From<VerbSet> for Vec<Verb> {
    fn from(set: VerbSet) -> Self {
        set.iter().collect()
    }
}

impl fmt::Debug for VerbSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for VerbSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|v| v.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}
