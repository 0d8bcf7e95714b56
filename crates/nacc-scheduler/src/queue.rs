//! Per-module file queues served in round-robin order.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use nacc_model::ModuleName;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Result, SchedulerError};
use crate::project::{Project, ProjectFile};

/// Matches `<anything>-<module>.<ext>` on the lower-cased file name.
static MODULE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+-([a-zA-Z]+)(\..+)$").expect("valid module file pattern"));

const ACCEPTED_EXTENSIONS: [&str; 2] = [".csv", ".json"];

/// Module named by a queued file's name, if the name has the
/// `<prefix>-<module>.csv` or `.json` form.
pub fn module_of(file_name: &str) -> Option<ModuleName> {
    let lowered = file_name.to_lowercase();
    let captures = MODULE_PATTERN.captures(&lowered)?;
    if !ACCEPTED_EXTENSIONS.contains(&&captures[2]) {
        return None;
    }
    ModuleName::new(&captures[1]).ok()
}

/// One queue per configured module plus a rotation cursor.
///
/// The cursor always indexes the configured module list, so every module is
/// visited in turn even when its queue is empty.
#[derive(Debug)]
pub struct FormSchedulerQueue {
    queues: Vec<(ModuleName, Vec<ProjectFile>)>,
    queue_tags: BTreeSet<String>,
    cursor: Option<usize>,
}

impl FormSchedulerQueue {
    pub fn new<I, S>(module_order: Vec<ModuleName>, queue_tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if module_order.is_empty() {
            return Err(SchedulerError::EmptyModuleOrder);
        }
        let mut seen = HashSet::new();
        for module in &module_order {
            if !seen.insert(module) {
                return Err(SchedulerError::DuplicateModule(module.clone()));
            }
        }
        Ok(Self {
            queues: module_order
                .into_iter()
                .map(|module| (module, Vec::new()))
                .collect(),
            queue_tags: queue_tags.into_iter().map(Into::into).collect(),
            cursor: None,
        })
    }

    pub fn queue_tags(&self) -> &BTreeSet<String> {
        &self.queue_tags
    }

    pub fn module_order(&self) -> impl Iterator<Item = &ModuleName> {
        self.queues.iter().map(|(module, _)| module)
    }

    /// Queues project files carrying every queue tag.
    ///
    /// Files whose name does not follow `<prefix>-<module>.csv|.json`, or whose
    /// module is not configured, are skipped with a warning. Files already
    /// queued are not queued twice. Each queue is then sorted oldest first.
    /// Returns the number of files added.
    pub fn add_files(&mut self, project: &dyn Project) -> Result<usize> {
        let mut added = 0;
        for file in project.files()? {
            if !file.has_tags(&self.queue_tags) {
                continue;
            }
            let Some(module) = module_of(&file.name) else {
                warn!(file = %file.name, "skipping queued file without a module suffix");
                continue;
            };
            let Some((_, queue)) = self.queues.iter_mut().find(|(name, _)| *name == module)
            else {
                warn!(file = %file.name, %module, "skipping queued file for unconfigured module");
                continue;
            };
            if queue.iter().any(|queued| queued.name == file.name) {
                continue;
            }
            debug!(file = %file.name, %module, "queued file");
            queue.push(file);
            added += 1;
        }

        for (_, queue) in &mut self.queues {
            queue.sort_by_key(|file| file.modified);
        }
        Ok(added)
    }

    /// Advances to the next module and returns it with its queue.
    ///
    /// The queue is returned as is; callers pop from the front.
    pub fn next_queue(&mut self) -> (&ModuleName, &mut Vec<ProjectFile>) {
        let next = self
            .cursor
            .map_or(0, |cursor| (cursor + 1) % self.queues.len());
        self.cursor = Some(next);
        let (module, queue) = &mut self.queues[next];
        (module, queue)
    }

    /// True when no module has a queued file.
    pub fn empty(&self) -> bool {
        self.queues.iter().all(|(_, queue)| queue.is_empty())
    }

    /// Total number of queued files.
    pub fn len(&self) -> usize {
        self.queues.iter().map(|(_, queue)| queue.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_suffix_is_parsed() {
        assert_eq!(module_of("ptenrl-ENROLL.csv").unwrap().as_str(), "enroll");
        assert_eq!(module_of("2024-visits-uds.json").unwrap().as_str(), "uds");
        assert!(module_of("visits-uds.txt").is_none());
        assert!(module_of("uds.csv").is_none());
        assert!(module_of("visits-uds4.csv").is_none());
    }

    #[test]
    fn rejects_empty_and_duplicate_order() {
        assert!(matches!(
            FormSchedulerQueue::new(Vec::new(), ["queued"]),
            Err(SchedulerError::EmptyModuleOrder)
        ));
        let uds = ModuleName::new("uds").unwrap();
        assert!(matches!(
            FormSchedulerQueue::new(vec![uds.clone(), uds], ["queued"]),
            Err(SchedulerError::DuplicateModule(_))
        ));
    }
}
