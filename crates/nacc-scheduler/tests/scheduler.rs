//! Queue rotation and scheduler loop tests.

use std::collections::BTreeSet;
use std::fs::File;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, TimeZone, Utc};
use nacc_model::ModuleName;
use nacc_scheduler::{
    FormScheduler, FormSchedulerQueue, LocalProject, Project, ProjectFile, RecordingPipeline,
    Result, SchedulerError,
};
use proptest::prelude::*;

#[derive(Default)]
struct MemoryProject {
    files: Vec<ProjectFile>,
}

impl MemoryProject {
    fn add(&mut self, name: &str, tags: &[&str], minute: u32) {
        self.files.push(ProjectFile {
            name: name.to_string(),
            tags: tags.iter().map(|tag| (*tag).to_string()).collect(),
            modified: at(minute),
        });
    }
}

impl Project for MemoryProject {
    fn files(&self) -> Result<Vec<ProjectFile>> {
        Ok(self.files.clone())
    }

    fn remove_tags(&mut self, name: &str, tags: &BTreeSet<String>) -> Result<()> {
        let file = self
            .files
            .iter_mut()
            .find(|file| file.name == name)
            .ok_or_else(|| SchedulerError::FileNotFound(name.to_string()))?;
        file.tags.retain(|tag| !tags.contains(tag));
        Ok(())
    }
}

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap()
}

fn modules(names: &[&str]) -> Vec<ModuleName> {
    names.iter().map(|name| ModuleName::new(*name).unwrap()).collect()
}

fn names(files: &[ProjectFile]) -> Vec<&str> {
    files.iter().map(|file| file.name.as_str()).collect()
}

#[test]
fn add_files_filters_by_tags_and_suffix() {
    let mut project = MemoryProject::default();
    project.add("b-uds.csv", &["queued"], 5);
    project.add("a-uds.csv", &["queued", "extra"], 1);
    project.add("c-uds.csv", &[], 0);
    project.add("d-enroll.json", &["queued"], 2);
    project.add("e-enroll.txt", &["queued"], 3);
    project.add("f-np.csv", &["queued"], 4);
    project.add("notes.csv", &["queued"], 4);

    let mut queue = FormSchedulerQueue::new(modules(&["enroll", "uds"]), ["queued"]).unwrap();
    assert_eq!(queue.add_files(&project).unwrap(), 3);

    let (module, files) = queue.next_queue();
    assert_eq!(module.as_str(), "enroll");
    assert_eq!(names(files), vec!["d-enroll.json"]);
    let (module, files) = queue.next_queue();
    assert_eq!(module.as_str(), "uds");
    assert_eq!(names(files), vec!["a-uds.csv", "b-uds.csv"]);
}

#[test]
fn adding_twice_does_not_duplicate() {
    let mut project = MemoryProject::default();
    project.add("a-uds.csv", &["queued"], 1);
    let mut queue = FormSchedulerQueue::new(modules(&["uds"]), ["queued"]).unwrap();
    assert_eq!(queue.add_files(&project).unwrap(), 1);
    assert_eq!(queue.add_files(&project).unwrap(), 0);
    assert_eq!(queue.len(), 1);
}

#[test]
fn scheduler_alternates_between_modules() {
    let mut project = MemoryProject::default();
    project.add("enroll-schema.json", &[], 0);
    project.add("uds-schema.json", &[], 0);
    project.add("u1-uds.csv", &["queued"], 1);
    project.add("u2-uds.csv", &["queued"], 2);
    project.add("u3-uds.csv", &["queued"], 3);
    project.add("e1-enroll.csv", &["queued"], 9);

    let queue = FormSchedulerQueue::new(modules(&["enroll", "uds"]), ["queued"]).unwrap();
    let mut pipeline = RecordingPipeline::new();
    let summary = FormScheduler::new(queue, &mut project, &mut pipeline)
        .run()
        .unwrap();

    let order: Vec<&str> = summary
        .submitted
        .iter()
        .map(|(_, file)| file.as_str())
        .collect();
    assert_eq!(order, vec!["e1-enroll.csv", "u1-uds.csv", "u2-uds.csv", "u3-uds.csv"]);
    assert_eq!(summary.scans, 2);
    assert_eq!(pipeline.submissions()[0].schema.name, "enroll-schema.json");
    assert!(project.files.iter().all(|file| !file.tags.contains("queued")));
}

#[test]
fn missing_schema_stops_the_run() {
    let mut project = MemoryProject::default();
    project.add("u1-uds.csv", &["queued"], 1);
    let queue = FormSchedulerQueue::new(modules(&["uds"]), ["queued"]).unwrap();
    let mut pipeline = RecordingPipeline::new();
    let result = FormScheduler::new(queue, &mut project, &mut pipeline).run();
    assert!(matches!(result, Err(SchedulerError::MissingSchema(_))));
}

#[test]
fn local_project_orders_by_modification_time() {
    let dir = tempfile::tempdir().unwrap();
    let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    for (name, offset) in [("new-uds.csv", 60), ("old-uds.csv", 0)] {
        let path = dir.path().join(name);
        std::fs::write(&path, "ptid\n1\n").unwrap();
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(base + Duration::from_secs(offset))
            .unwrap();
    }
    let mut project = LocalProject::open(dir.path()).unwrap();
    project.add_tags("new-uds.csv", ["queued"]).unwrap();
    project.add_tags("old-uds.csv", ["queued"]).unwrap();

    let mut queue = FormSchedulerQueue::new(modules(&["uds"]), ["queued"]).unwrap();
    assert_eq!(queue.add_files(&project).unwrap(), 2);
    let (_, files) = queue.next_queue();
    assert_eq!(names(files), vec!["old-uds.csv", "new-uds.csv"]);
}

proptest! {
    #[test]
    fn every_module_visited_once_per_rotation(
        count in 1usize..8,
        rotations in 1usize..4,
        filled in prop::collection::vec(any::<bool>(), 8),
    ) {
        let names: Vec<String> = (0..count)
            .map(|index| char::from(b'a' + index as u8).to_string().repeat(3))
            .collect();
        let order: Vec<ModuleName> = names.iter().map(|name| ModuleName::new(name.as_str()).unwrap()).collect();

        let mut project = MemoryProject::default();
        for (index, name) in names.iter().enumerate() {
            if filled[index] {
                project.add(&format!("f-{name}.csv"), &["queued"], index as u32);
            }
        }

        let mut queue = FormSchedulerQueue::new(order.clone(), ["queued"]).unwrap();
        queue.add_files(&project).unwrap();
        for _ in 0..rotations {
            let visited: Vec<ModuleName> = (0..count).map(|_| queue.next_queue().0.clone()).collect();
            prop_assert_eq!(&visited, &order);
        }
    }
}
