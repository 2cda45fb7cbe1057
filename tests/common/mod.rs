// Test utility module for grademap integration tests
#![allow(dead_code)]

use chrono::NaiveDate;

use grademap::{
    CapitalizedUe, Enrollment, EnrollmentState, MemorySnapshot, MemoryStore, ModuleCode, ModuleId,
    ModuleImpl, ModuleImplId, Score, SemesterId, SemesterInfo, StudentId, StudentIdentity, Ue,
    UeCode, UeId, UeKind,
};

/// Route engine debug output to the test harness when RUST_LOG asks for it
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn semester_info(id: &str, term: u32, year: i32) -> SemesterInfo {
    SemesterInfo {
        id: SemesterId::new(id),
        term,
        title: format!("Semestre {term}"),
        start_date: NaiveDate::from_ymd_opt(year, 9, 1).unwrap(),
        academic_year_start: year,
        academic_year_end: year + 1,
    }
}

pub fn standard_ue(id: &str, code: &str) -> Ue {
    Ue {
        id: UeId::new(id),
        code: UeCode::new(code),
        short_name: code.to_string(),
        kind: UeKind::Standard,
    }
}

pub fn sport_ue(id: &str, code: &str) -> Ue {
    Ue {
        id: UeId::new(id),
        code: UeCode::new(code),
        short_name: code.to_string(),
        kind: UeKind::SportCulture,
    }
}

// Fluent snapshot assembly for the scenarios below
pub struct SnapshotBuilder {
    snapshot: MemorySnapshot,
}

impl SnapshotBuilder {
    pub fn new(info: SemesterInfo) -> Self {
        Self {
            snapshot: MemorySnapshot::new(info),
        }
    }

    pub fn ue(mut self, ue: &Ue) -> Self {
        self.snapshot.ues.push(ue.clone());
        self
    }

    pub fn module(
        mut self,
        id: &str,
        code: &str,
        coefficient: f64,
        ue: &Ue,
        tags: &[&str],
    ) -> Self {
        self.snapshot.module_impls.push(ModuleImpl {
            id: ModuleImplId::new(id),
            module_id: ModuleId::new(format!("m-{id}")),
            code: ModuleCode::new(code),
            coefficient,
            ue: ue.clone(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        });
        self
    }

    pub fn student(mut self, id: &str, last_name: &str, first_name: &str) -> Self {
        let student = StudentId::new(id);
        self.snapshot.enrollments.push(Enrollment {
            student: student.clone(),
            state: EnrollmentState::Enrolled,
        });
        self.snapshot
            .identities
            .insert(student, StudentIdentity::new(last_name, first_name));
        self
    }

    pub fn withdrawn(mut self, id: &str) -> Self {
        self.snapshot.enrollments.push(Enrollment {
            student: StudentId::new(id),
            state: EnrollmentState::Withdrawn,
        });
        self
    }

    pub fn score(mut self, modimpl: &str, student: &str, score: Score) -> Self {
        self.snapshot
            .record_score(&ModuleImplId::new(modimpl), &StudentId::new(student), score);
        self
    }

    pub fn ue_average(mut self, student: &str, ue: &Ue, average: f64) -> Self {
        self.snapshot
            .set_ue_average(&StudentId::new(student), &ue.id, average);
        self
    }

    pub fn general_average(mut self, student: &str, score: Score) -> Self {
        self.snapshot
            .set_general_average(&StudentId::new(student), score);
        self
    }

    pub fn capitalized(mut self, student: &str, ue: &Ue, semester: &str) -> Self {
        self.snapshot.add_capitalized(
            &StudentId::new(student),
            CapitalizedUe {
                ue_id: ue.id.clone(),
                ue_code: ue.code.clone(),
                semester: SemesterId::new(semester),
            },
        );
        self
    }

    pub fn build(self) -> MemorySnapshot {
        self.snapshot
    }
}

pub fn store_of(snapshots: Vec<MemorySnapshot>) -> MemoryStore {
    let mut store = MemoryStore::new();
    for snapshot in snapshots {
        store.insert(snapshot);
    }
    store
}
