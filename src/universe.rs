//! Historical ticker universe.
//!
//! The scoring server hands out evaluation windows anywhere between 2000 and
//! today, so the candidate set is keyed off the window's final year: a base
//! list for the era, the index tickers, and anything that first listed in
//! that exact year. The built-in dataset can be overridden with a JSON file
//! of the same shape for drills against a different universe.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use once_cell::sync::Lazy;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("failed to read universe dataset '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("universe dataset '{path}' is not valid JSON: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Universe {
    pub version: String,
    /// Base list for windows ending in 2010 or earlier.
    pub pre_2010: Vec<String>,
    /// Base list for windows ending strictly between 2010 and 2020.
    pub era_2010s: Vec<String>,
    /// Index and benchmark tickers, eligible in every era.
    pub indexes: Vec<String>,
    /// Tickers that first listed in a given year, unioned in for that year.
    pub listed_by_year: BTreeMap<i32, Vec<String>>,
}

impl Universe {
    pub fn builtin() -> &'static Universe {
        &BUILTIN
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, UniverseError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| UniverseError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| UniverseError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Candidate tickers for a window ending in `year`, deduplicated and in
    /// ascending order so that every run over the same brief sees the same
    /// sequence.
    pub fn candidates_for(&self, year: i32) -> Vec<String> {
        let mut set: BTreeSet<&str> = BTreeSet::new();

        if year <= 2010 {
            set.extend(self.pre_2010.iter().map(String::as_str));
        } else if year < 2020 {
            set.extend(self.era_2010s.iter().map(String::as_str));
        }
        set.extend(self.indexes.iter().map(String::as_str));

        if let Some(listed) = self.listed_by_year.get(&year) {
            set.extend(listed.iter().map(String::as_str));
        }

        set.into_iter().map(str::to_owned).collect()
    }
}

fn owned(tickers: &[&str]) -> Vec<String> {
    tickers.iter().map(|t| t.to_string()).collect()
}

static BUILTIN: Lazy<Universe> = Lazy::new(|| Universe {
    version: "2025.04".to_string(),
    pre_2010: owned(&[
        "SCCO", "VALE", "GGB", "MO", "BOOM", "BPT", "DECK", "BBD", "AMED", "CLH", "BRFS", "MNST",
        "MED", "BWEN", "HUSA", "SID", "AIMD", "CIG",
    ]),
    era_2010s: owned(&["ARMN"]),
    indexes: owned(&[
        "DGNX", "AIMAW", "MGAM", "AREBW", "DATSW", "RGC", "GATEW", "HONDW", "YOSH", "WLDSW",
        "LXEH", "MNDR", "FTFT", "CRVO", "TOI", "TWNPV", "MLGO", "GITS", "DOMH", "TWNP", "GATE",
        "NMAX", "ABTS", "SKBL", "GSPC", "MSCI", "AAPL", "DJI",
    ]),
    listed_by_year: BTreeMap::from([
        (2007, owned(&["UAVS"])),
        (2008, owned(&["AIMD", "NIXX", "TOMZ"])),
        (2010, owned(&["ARMN"])),
        (2013, owned(&["NUTX"])),
        (2014, owned(&["PETV"])),
        (
            2015,
            owned(&[
                "BLNE", "AIMD", "GRNQ", "FNGR", "PNBK", "AVXL", "ENVB", "DLPN", "WKHS", "AUID",
                "AMBO", "THTX",
            ]),
        ),
        (2017, owned(&["AQB", "FRHC", "HIVE"])),
        (2018, owned(&["ALAR", "ALBT"])),
        (
            2019,
            owned(&[
                "AXSM", "FTLF", "SOBR", "TNK", "NCRA", "OXBRW", "KOD", "QIPT", "SBEV", "RLMD",
                "EVER", "RCEL", "DRRX", "IVDA", "CTM", "NCPL", "NISN", "BATL", "MBOT", "SAVA",
                "OESX", "CDLX", "NGNE", "ENPH", "PNTG",
            ]),
        ),
        (2020, owned(&["FFIE"])),
        (2021, owned(&["GFRX"])),
        (2022, owned(&["APCXM"])),
        (2023, owned(&["AZTR", "MDXH"])),
        (
            2024,
            owned(&[
                "WLDSW", "MTEKW", "NXLIW", "RGTIW", "TSSI", "SNYR", "RZLVW", "GRRRW", "AISPW",
                "SOUNW", "WGS", "DRUG", "ILLRW", "KULR", "QUBT", "LENZ", "PDYN", "FLDDW", "WGSWW",
                "ZIVO", "RVSNW", "RGTI", "RCAT", "PSIX", "MNPR",
            ]),
        ),
    ]),
});
