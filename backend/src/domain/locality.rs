//! Locality → neighbourhood lookup table.
//!
//! The catalogue is static reference data consumed synchronously by
//! validation and by the locality endpoints. A small built-in table covers
//! the province's main cities; [`LocalityCatalogue::load`] replaces it with a
//! JSON file at start-up.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use cap_std::{ambient_authority, fs::Dir};
use serde::{Deserialize, Serialize};

use crate::domain::draft::LocalityChoice;

/// Wire id the registration API reserves for "other".
pub const OTHER_WIRE_ID: u32 = 999;

/// Catalogue identifier of a locality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalityId(u32);

impl LocalityId {
    /// Wrap a raw catalogue id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw numeric id.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LocalityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalogue identifier of a neighbourhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NeighbourhoodId(u32);

impl NeighbourhoodId {
    /// Wrap a raw catalogue id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw numeric id.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NeighbourhoodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Neighbourhood listed under a locality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbourhood {
    pub id: NeighbourhoodId,
    pub name: String,
}

/// Locality with its ordered neighbourhoods.
///
/// `capital` marks the designated capital city, where a neighbourhood is
/// mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locality {
    pub id: LocalityId,
    pub name: String,
    #[serde(default)]
    pub capital: bool,
    #[serde(default)]
    pub neighbourhoods: Vec<Neighbourhood>,
}

/// Errors raised while building or loading a catalogue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogueError {
    #[error("failed to read locality catalogue {path}: {message}")]
    Io { path: String, message: String },
    #[error("failed to decode locality catalogue: {message}")]
    Decode { message: String },
    #[error("id {id} is reserved for \"other\" entries")]
    ReservedId { id: u32 },
    #[error("locality id {id} is listed more than once")]
    DuplicateLocality { id: LocalityId },
    #[error("neighbourhood id {id} is listed more than once under locality {locality}")]
    DuplicateNeighbourhood {
        locality: LocalityId,
        id: NeighbourhoodId,
    },
}

/// Ordered, read-only locality table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalityCatalogue {
    localities: Vec<Locality>,
}

impl LocalityCatalogue {
    /// Build a catalogue, rejecting duplicate or reserved ids.
    pub fn new(localities: Vec<Locality>) -> Result<Self, CatalogueError> {
        let mut seen = BTreeSet::new();
        for locality in &localities {
            if locality.id.get() == OTHER_WIRE_ID {
                return Err(CatalogueError::ReservedId { id: OTHER_WIRE_ID });
            }
            if !seen.insert(locality.id) {
                return Err(CatalogueError::DuplicateLocality { id: locality.id });
            }
            let mut neighbourhood_ids = BTreeSet::new();
            for neighbourhood in &locality.neighbourhoods {
                if neighbourhood.id.get() == OTHER_WIRE_ID {
                    return Err(CatalogueError::ReservedId { id: OTHER_WIRE_ID });
                }
                if !neighbourhood_ids.insert(neighbourhood.id) {
                    return Err(CatalogueError::DuplicateNeighbourhood {
                        locality: locality.id,
                        id: neighbourhood.id,
                    });
                }
            }
        }
        Ok(Self { localities })
    }

    /// Decode a JSON array of localities.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CatalogueError> {
        let localities: Vec<Locality> =
            serde_json::from_slice(bytes).map_err(|error| CatalogueError::Decode {
                message: error.to_string(),
            })?;
        Self::new(localities)
    }

    /// Read and decode a JSON catalogue file.
    pub fn load(path: &Path) -> Result<Self, CatalogueError> {
        let io_error = |message: String| CatalogueError::Io {
            path: path.display().to_string(),
            message,
        };
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .ok_or_else(|| io_error("path has no file name".to_owned()))?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority())
            .map_err(|error| io_error(error.to_string()))?;
        let bytes = dir
            .read(file_name)
            .map_err(|error| io_error(error.to_string()))?;
        Self::from_json(&bytes)
    }

    /// Built-in table used when no catalogue file is configured.
    pub fn builtin() -> Self {
        fn listed(id: u32, names: &[&str]) -> Vec<Neighbourhood> {
            (id..)
                .zip(names)
                .map(|(id, name)| Neighbourhood {
                    id: NeighbourhoodId::new(id),
                    name: (*name).to_owned(),
                })
                .collect()
        }
        fn locality(id: u32, name: &str, capital: bool, neighbourhoods: Vec<Neighbourhood>) -> Locality {
            Locality {
                id: LocalityId::new(id),
                name: name.to_owned(),
                capital,
                neighbourhoods,
            }
        }

        Self {
            localities: vec![
                locality(
                    1,
                    "CORDOBA CAPITAL",
                    true,
                    listed(
                        101,
                        &[
                            "ALBERDI",
                            "ALTA CORDOBA",
                            "CENTRO",
                            "CERRO DE LAS ROSAS",
                            "GENERAL PAZ",
                            "GUEMES",
                            "NUEVA CORDOBA",
                            "SAN VICENTE",
                        ],
                    ),
                ),
                locality(
                    2,
                    "VILLA CARLOS PAZ",
                    false,
                    listed(201, &["CENTRO", "VILLA DEL LAGO", "PLAYAS DE ORO"]),
                ),
                locality(
                    3,
                    "RIO CUARTO",
                    false,
                    listed(301, &["CENTRO", "BANDA NORTE", "ALBERDI"]),
                ),
                locality(4, "ALTA GRACIA", false, Vec::new()),
                locality(5, "VILLA MARIA", false, Vec::new()),
                locality(6, "JESUS MARIA", false, Vec::new()),
            ],
        }
    }

    /// All localities in display order.
    pub fn localities(&self) -> &[Locality] {
        &self.localities
    }

    /// Look up a locality by id.
    pub fn locality(&self, id: LocalityId) -> Option<&Locality> {
        self.localities.iter().find(|locality| locality.id == id)
    }

    /// Neighbourhoods listed under a locality, `None` for unknown ids.
    pub fn neighbourhoods(&self, id: LocalityId) -> Option<&[Neighbourhood]> {
        self.locality(id)
            .map(|locality| locality.neighbourhoods.as_slice())
    }

    /// Whether `neighbourhood` is listed under `locality`.
    pub fn contains_neighbourhood(&self, locality: LocalityId, neighbourhood: NeighbourhoodId) -> bool {
        self.neighbourhoods(locality)
            .is_some_and(|listed| listed.iter().any(|entry| entry.id == neighbourhood))
    }

    /// Case-insensitive substring search over locality names.
    pub fn search(&self, query: &str) -> Vec<&Locality> {
        let needle = query.trim().to_lowercase();
        self.localities
            .iter()
            .filter(|locality| needle.is_empty() || locality.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Whether the chosen locality makes the neighbourhood mandatory.
    ///
    /// True for the designated capital and for "other" localities.
    pub fn requires_neighbourhood(&self, choice: &LocalityChoice) -> bool {
        match choice {
            LocalityChoice::Unset => false,
            LocalityChoice::Known { id } => self.locality(*id).is_some_and(|locality| locality.capital),
            LocalityChoice::Other { .. } => true,
        }
    }
}

impl Default for LocalityCatalogue {
    fn default() -> Self {
        Self::builtin()
    }
}
