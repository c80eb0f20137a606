//! 關聯檔案（sidecar）解析
//!
//! 以（所在資料夾, 不含副檔名的檔名）分組，組內副檔名屬於 sidecar 清單者
//! 掛到該組第一個主檔底下；整組都是 sidecar 時，最早探索到的那個升為主檔

use super::file_record::FileRecord;
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// 主檔來源路徑 -> sidecar 來源路徑
pub type AssociationMap = BTreeMap<PathBuf, Vec<PathBuf>>;

/// 分組鍵：分隔符號統一為 `/`，區分大小寫
#[must_use]
pub fn group_key(path: &Path) -> (String, String) {
    let directory = path
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    (directory, stem)
}

#[derive(Debug, Clone)]
pub struct AssociationResolver {
    sidecar_extensions: BTreeSet<String>,
}

impl AssociationResolver {
    /// 副檔名不分大小寫，可含前導點
    #[must_use]
    pub fn new<I, S>(sidecar_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            sidecar_extensions: sidecar_extensions
                .into_iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn is_sidecar(&self, record: &FileRecord) -> bool {
        self.sidecar_extensions.contains(record.extension())
    }

    #[must_use]
    pub fn sidecar_extensions(&self) -> &BTreeSet<String> {
        &self.sidecar_extensions
    }

    /// 建立關聯，回傳主檔（依探索順序）與關聯表
    ///
    /// 一組內有多個主檔時，sidecar 只歸第一個主檔所有，其餘主檔不帶 sidecar
    pub fn link(&self, records: Vec<FileRecord>) -> (Vec<FileRecord>, AssociationMap) {
        let mut records = records;
        records.sort_by_key(FileRecord::discovery_index);

        let mut group_order: Vec<(String, String)> = Vec::new();
        let mut groups: HashMap<(String, String), (Vec<FileRecord>, Vec<FileRecord>)> =
            HashMap::new();

        for record in records {
            let key = group_key(record.source_path());
            let is_sidecar = self.is_sidecar(&record);
            let entry = groups.entry(key.clone()).or_insert_with(|| {
                group_order.push(key);
                (Vec::new(), Vec::new())
            });
            if is_sidecar {
                entry.1.push(record);
            } else {
                entry.0.push(record);
            }
        }

        let mut primaries = Vec::new();
        let mut associations = AssociationMap::new();

        for key in group_order {
            let Some((mut main_files, sidecars)) = groups.remove(&key) else {
                continue;
            };

            let mut sidecars = sidecars.into_iter();
            if main_files.is_empty() {
                match sidecars.next() {
                    Some(promoted) => main_files.push(promoted),
                    None => continue,
                }
            }

            let owner = &mut main_files[0];
            for sidecar in sidecars {
                debug!(
                    "關聯 {} -> {}",
                    sidecar.display_name(),
                    owner.display_name()
                );
                owner.add_associated_file(sidecar);
            }

            if !owner.associated_files().is_empty() {
                associations.insert(
                    owner.source_path().to_path_buf(),
                    owner
                        .associated_files()
                        .iter()
                        .map(|s| s.source_path().to_path_buf())
                        .collect(),
                );
            }

            primaries.extend(main_files);
        }

        primaries.sort_by_key(FileRecord::discovery_index);
        (primaries, associations)
    }
}
