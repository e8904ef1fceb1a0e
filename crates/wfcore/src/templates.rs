//! Ready-made workflows offered when creating a new one.

use crate::{NodeType, WorkflowDraft, WorkflowNode};
use crate::workflow::Workflow;

pub fn workflow_templates() -> Vec<WorkflowDraft> {
    vec![task_complete_email(), approval()]
}

fn task_complete_email() -> WorkflowDraft {
    let mut wf = Workflow::new("Email Notification on Task Complete")
        .with_description("Send email when a task is marked as complete");

    wf.push_node(
        WorkflowNode::new("1", NodeType::Trigger, "Task Completed")
            .with_description("Triggers when task status changes to done")
            .with_config("triggerType", "event")
            .with_position(250.0, 50.0),
    );
    wf.push_node(
        WorkflowNode::new("2", NodeType::Notification, "Send Email")
            .with_description("Notify team members")
            .with_config("channel", "email")
            .with_config("message", "Task has been completed!")
            .with_position(250.0, 200.0),
    );
    wf.connect("1", "2");

    into_draft(wf)
}

fn approval() -> WorkflowDraft {
    let mut wf = Workflow::new("Approval Workflow").with_description("Review and approve/reject items");

    wf.push_node(
        WorkflowNode::new("1", NodeType::Trigger, "New Submission")
            .with_description("Triggers on new item submission")
            .with_position(250.0, 50.0),
    );
    wf.push_node(
        WorkflowNode::new("2", NodeType::Condition, "Check Status")
            .with_description("Approved or Rejected?")
            .with_config("condition", "status == approved")
            .with_position(250.0, 200.0),
    );
    wf.push_node(
        WorkflowNode::new("3", NodeType::Notification, "Approved Notification")
            .with_description("Send approval email")
            .with_position(100.0, 350.0),
    );
    wf.push_node(
        WorkflowNode::new("4", NodeType::Notification, "Rejected Notification")
            .with_description("Send rejection email")
            .with_position(400.0, 350.0),
    );
    wf.connect("1", "2");
    wf.connect_handle("2", "true", "3");
    wf.connect_handle("2", "false", "4");

    into_draft(wf)
}

fn into_draft(wf: Workflow) -> WorkflowDraft {
    WorkflowDraft {
        name: wf.name,
        description: wf.description,
        is_active: wf.is_active,
        nodes: wf.nodes,
        edges: wf.edges,
    }
}
