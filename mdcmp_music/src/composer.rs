// A bank of MDC files layered into one output.
//
// `load_bank` walks a directory tree and registers every `*.mdc` file under
// the key `<parent dir>.<file stem>`, so `bank/drums/rock.mdc` becomes
// `drums.rock`. `convert` feeds a banked file through the shared converter;
// because the converter's track counter persists, each converted file
// lands on fresh tracks after the previous ones.

use crate::converter::Converter;
use crate::error::{MdcError, Result};
use crate::sink::EventSink;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MDC_EXTENSION: &str = "mdc";

pub struct Composer<S: EventSink> {
    converter: Converter<S>,
    bank: BTreeMap<String, PathBuf>,
}

impl<S: EventSink> Composer<S> {
    pub fn new(converter: Converter<S>) -> Self {
        Composer {
            converter,
            bank: BTreeMap::new(),
        }
    }

    /// Register every `*.mdc` file under `dir`, recursively. Returns how
    /// many files were added. A later file with the same key replaces an
    /// earlier one.
    pub fn load_bank(&mut self, dir: &Path) -> Result<usize> {
        let mut found = Vec::new();
        collect_mdc_files(dir, &mut found)?;
        found.sort();
        for path in &found {
            let Some(key) = bank_key(path) else {
                continue;
            };
            debug!(key = %key, path = %path.display(), "banked");
            self.bank.insert(key, path.clone());
        }
        info!(dir = %dir.display(), files = found.len(), "loaded mdc bank");
        Ok(found.len())
    }

    /// Banked keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        self.bank.keys().map(String::as_str).collect()
    }

    pub fn path(&self, key: &str) -> Option<&Path> {
        self.bank.get(key).map(PathBuf::as_path)
    }

    /// Convert the banked file under `key`. Returns the number of tracks
    /// written.
    pub fn convert(&mut self, key: &str) -> Result<usize> {
        let path = self
            .bank
            .get(key)
            .ok_or_else(|| MdcError::UnknownBankKey(key.to_string()))?;
        self.converter.convert_file(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.converter.save(path)
    }

    pub fn converter(&self) -> &Converter<S> {
        &self.converter
    }

    pub fn into_converter(self) -> Converter<S> {
        self.converter
    }
}

fn collect_mdc_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_mdc_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == MDC_EXTENSION) {
            out.push(path);
        }
    }
    Ok(())
}

/// `<parent dir name>.<file stem>`.
fn bank_key(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let parent = path.parent()?.file_name()?.to_str()?;
    Some(format!("{parent}.{stem}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_parent_and_stem() {
        assert_eq!(
            bank_key(Path::new("/bank/drums/rock.mdc")).as_deref(),
            Some("drums.rock")
        );
        assert_eq!(bank_key(Path::new("rock.mdc")), None);
    }
}
