use serde::{Deserialize, Serialize};

/// A named category that owns its own folder namespace and
/// selected-folder slot. Favorites and projects additionally have
/// entity managers; memories and prompts only carry folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Favorites,
    Projects,
    Memories,
    Prompts,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Favorites => "favorites",
            Section::Projects => "projects",
            Section::Memories => "memories",
            Section::Prompts => "prompts",
        }
    }

    pub const ALL: [Section; 4] = [
        Section::Favorites,
        Section::Projects,
        Section::Memories,
        Section::Prompts,
    ];
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "favorites" => Ok(Section::Favorites),
            "projects" => Ok(Section::Projects),
            "memories" => Ok(Section::Memories),
            "prompts" => Ok(Section::Prompts),
            other => Err(format!("unknown section: {other}")),
        }
    }
}
