use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::api::{ApiError, ApiResult, TippingApi};
use crate::model::{Fixture, PriorTip, Round, Team};
use crate::session::Session;
use crate::state::{Delta, ProviderCommand};

/// Runs API work off the UI thread until the command channel closes.
pub fn spawn_provider<A>(
    mut api: A,
    mut session: Session,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> JoinHandle<()>
where
    A: TippingApi + Sync + Send + 'static,
{
    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            for delta in handle_command(&mut api, &mut session, cmd) {
                if tx.send(delta).is_err() {
                    return;
                }
            }
        }
    })
}

pub fn handle_command<A>(api: &mut A, session: &mut Session, cmd: ProviderCommand) -> Vec<Delta>
where
    A: TippingApi + Sync,
{
    match cmd {
        ProviderCommand::RestoreSession => vec![Delta::SessionRestored(session.restore(api))],
        ProviderCommand::Login { email, password } => {
            match session.login(api, &email, &password) {
                Ok(user) => vec![Delta::SignedIn(user)],
                Err(err) => vec![Delta::AuthFailed(err.to_string())],
            }
        }
        ProviderCommand::Register(form) => match session.register(api, &form) {
            Ok(user) => vec![Delta::SignedIn(user)],
            Err(err) => vec![Delta::AuthFailed(err.to_string())],
        },
        ProviderCommand::Logout => {
            session.logout(api);
            vec![Delta::SignedOut]
        }
        ProviderCommand::FetchTeams => match api.teams() {
            Ok(teams) => vec![Delta::SetTeams(teams)],
            Err(err) => vec![Delta::Log(format!("[WARN] Teams fetch failed: {err}"))],
        },
        ProviderCommand::LoadRoundsAndTeams => match load_rounds_and_teams(api) {
            Ok((rounds, teams)) => vec![Delta::RoundsAndTeams { rounds, teams }],
            Err(err) => failure(api, session, err, Delta::RoundsFailed),
        },
        ProviderCommand::LoadRound { ticket, round_id } => match load_round(api, round_id) {
            Ok((fixtures, prior_tips)) => vec![Delta::RoundLoaded {
                ticket,
                round_id,
                fixtures,
                prior_tips,
            }],
            Err(err) => failure(api, session, err, |message| Delta::RoundLoadFailed {
                ticket,
                round_id,
                message,
            }),
        },
        ProviderCommand::SubmitTips(tips) => {
            // Empty batches never reach the network.
            if tips.is_empty() {
                return Vec::new();
            }
            match api.submit_tips(&tips) {
                Ok(()) => vec![Delta::TipsSubmitted { count: tips.len() }],
                Err(err) => failure(api, session, err, Delta::TipsSubmitFailed),
            }
        }
        ProviderCommand::FetchLeaderboard => match api.leaderboard() {
            Ok(rows) => vec![Delta::SetLeaderboard(rows)],
            Err(err) => failure(api, session, err, Delta::RequestFailed),
        },
        ProviderCommand::FetchGroups => match api.groups() {
            Ok(groups) => vec![Delta::SetGroups(groups)],
            Err(err) => failure(api, session, err, Delta::RequestFailed),
        },
        ProviderCommand::FetchGroupLeaderboard { group_id } => {
            match api.group_leaderboard(group_id) {
                Ok(rows) => vec![Delta::SetGroupLeaderboard { group_id, rows }],
                Err(err) => failure(api, session, err, |message| {
                    Delta::GroupLeaderboardFailed { group_id, message }
                }),
            }
        }
        ProviderCommand::CreateGroup { name } => match api.create_group(&name) {
            Ok(group) => vec![Delta::GroupCreated(group)],
            Err(err) => failure(api, session, err, Delta::RequestFailed),
        },
        ProviderCommand::JoinGroup { code } => match api.join_group(&code) {
            Ok(()) => vec![Delta::GroupJoined],
            Err(err) => failure(api, session, err, Delta::RequestFailed),
        },
    }
}

/// A rejected token ends the session; any other error goes into `delta`.
fn failure<A, F>(api: &mut A, session: &mut Session, err: ApiError, delta: F) -> Vec<Delta>
where
    A: TippingApi,
    F: FnOnce(String) -> Delta,
{
    if err.is_auth() {
        tracing::info!(error = %err, "token rejected mid-session");
        session.logout(api);
        return vec![Delta::SessionExpired(err.to_string())];
    }
    vec![delta(err.to_string())]
}

/// Both lists or neither.
pub fn load_rounds_and_teams<A>(api: &A) -> ApiResult<(Vec<Round>, Vec<Team>)>
where
    A: TippingApi + Sync,
{
    let (teams, rounds) = rayon::join(|| api.teams(), || api.rounds());
    Ok((rounds?, teams?))
}

/// Fixtures are required; a failed prior-tips fetch means "none yet".
pub fn load_round<A: TippingApi>(api: &A, round_id: u32) -> ApiResult<(Vec<Fixture>, Vec<PriorTip>)> {
    let fixtures = api.fixtures(round_id)?;
    let prior_tips = api.round_tips(round_id).unwrap_or_else(|err| {
        tracing::debug!(round_id, error = %err, "no prior tips for round");
        Vec::new()
    });
    Ok((fixtures, prior_tips))
}
