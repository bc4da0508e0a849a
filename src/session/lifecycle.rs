// ABOUTME: Session lifecycle operations performed around plan execution
// ABOUTME: Creates sessions, attaches generated plans and marks plans accepted

use tracing::{info, warn};

use super::error::SessionError;
use super::state::SessionState;
use super::store::StateStore;
use crate::engine::result::OverallStatus;
use crate::plan::{Plan, PlanValidator};

pub const PLAN_ACCEPTED_MESSAGE: &str = "Plan accepted by user. Ready for execution.";

/// Create and persist a new session, returning its id
pub async fn create_session(
    store: &dyn StateStore,
    user_query: &str,
) -> Result<String, SessionError> {
    let session_id = uuid::Uuid::new_v4().simple().to_string();
    let state = SessionState::new(session_id.clone(), user_query);

    store.save(&state).await?;

    info!("Created new workflow session: {}", session_id);
    Ok(session_id)
}

pub async fn load_session(
    store: &dyn StateStore,
    session_id: &str,
) -> Result<SessionState, SessionError> {
    Ok(store.load(session_id).await?)
}

/// Store a freshly generated plan on the session, awaiting acceptance
pub async fn attach_plan(
    store: &dyn StateStore,
    session_id: &str,
    plan: Plan,
) -> Result<SessionState, SessionError> {
    check_plan(&plan)?;

    let mut state = store.load(session_id).await?;
    let task_count = plan.len();

    state.plan = Some(plan);
    state.accepted = false;
    state.overall_status = OverallStatus::PlanCreated;
    state.reset_progress();
    state.log(format!(
        "Plan created with {} tasks, awaiting acceptance.",
        task_count
    ));

    store.save(&state).await?;
    info!("Attached plan with {} tasks to session {}", task_count, session_id);
    Ok(state)
}

/// Mark the session's plan accepted and initialize every task to pending
pub async fn accept_plan(
    store: &dyn StateStore,
    session_id: &str,
) -> Result<SessionState, SessionError> {
    let mut state = store.load(session_id).await?;

    let Some(plan) = state.plan.as_ref() else {
        warn!("Cannot accept plan for session {}: no plan found", session_id);
        return Err(SessionError::NoPlan {
            session_id: session_id.to_string(),
        });
    };
    check_plan(plan)?;

    state.accepted = true;
    state.overall_status = OverallStatus::Accepted;
    state.reset_progress();
    state.log(PLAN_ACCEPTED_MESSAGE);

    store.save(&state).await?;
    info!(
        "Marked plan accepted for session {}, initialized {} task statuses",
        session_id,
        state.task_status.len()
    );
    Ok(state)
}

fn check_plan(plan: &Plan) -> Result<(), SessionError> {
    let report = PlanValidator::new()
        .with_cycle_detection(true)
        .validate(plan);

    if report.is_valid {
        Ok(())
    } else {
        Err(SessionError::InvalidPlan {
            reason: report.summary(),
        })
    }
}
