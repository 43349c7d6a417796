//! Access Evaluator: the fixed owner/member policy table for projects.
//!
//! Tasks carry no policy of their own — every task operation is evaluated as
//! `Read` against the task's parent project. The owner is implicitly a reader
//! and is never duplicated into the members set.

use uuid::Uuid;

use crate::storage::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectOp {
    Read,
    Update,
    Delete,
    AddMember,
}

pub fn can_access(user_id: Uuid, project: &Project, op: ProjectOp) -> bool {
    let is_owner = project.owner == user_id;
    match op {
        ProjectOp::Read => is_owner || project.members.contains(&user_id),
        ProjectOp::Update | ProjectOp::Delete | ProjectOp::AddMember => is_owner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn project(owner: Uuid, members: Vec<Uuid>) -> Project {
        Project {
            id: Uuid::new_v4(),
            name: "p".into(),
            description: String::new(),
            owner,
            members,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn owner_passes_every_operation() {
        let owner = Uuid::new_v4();
        let p = project(owner, vec![]);
        for op in [ProjectOp::Read, ProjectOp::Update, ProjectOp::Delete, ProjectOp::AddMember] {
            assert!(can_access(owner, &p, op), "owner must pass {:?}", op);
        }
    }

    #[test]
    fn member_reads_but_cannot_mutate() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let p = project(owner, vec![member]);
        assert!(can_access(member, &p, ProjectOp::Read));
        for op in [ProjectOp::Update, ProjectOp::Delete, ProjectOp::AddMember] {
            assert!(!can_access(member, &p, op), "member must fail {:?}", op);
        }
    }

    #[test]
    fn stranger_fails_everything() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let p = project(owner, vec![Uuid::new_v4()]);
        for op in [ProjectOp::Read, ProjectOp::Update, ProjectOp::Delete, ProjectOp::AddMember] {
            assert!(!can_access(stranger, &p, op), "stranger must fail {:?}", op);
        }
    }
}
