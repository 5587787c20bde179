mod common;

use cmk_tipping::model::{CreatedGroup, Group, PriorTip, RoundStatus};
use cmk_tipping::session::AuthState;
use cmk_tipping::state::{
    AppState, AuthField, AuthMode, DEFAULT_BRANDING, Delta, PromptKind, ProviderCommand, Screen,
    apply_delta,
};
use cmk_tipping::tips::{Margin, MarginBucket, MarginMode};

use common::{board_row, fixture, round, team, user};

fn signed_in(mode: MarginMode) -> AppState {
    let mut state = AppState::new(mode, false);
    apply_delta(&mut state, Delta::SignedIn(user(1, "Alice")));
    state
}

/// Signed in with rounds listed and round 2 loaded.
fn with_round_loaded(mode: MarginMode) -> AppState {
    let mut state = signed_in(mode);
    let cmds = apply_delta(
        &mut state,
        Delta::RoundsAndTeams {
            rounds: vec![
                round(1, 1, RoundStatus::Completed),
                round(2, 2, RoundStatus::Open),
            ],
            teams: vec![team(10, "Mowbray", "MOW")],
        },
    );
    let ticket = match cmds.as_slice() {
        [ProviderCommand::LoadRound { ticket, round_id: 2 }] => *ticket,
        other => panic!("expected a load for round 2, got {other:?}"),
    };
    apply_delta(
        &mut state,
        Delta::RoundLoaded {
            ticket,
            round_id: 2,
            fixtures: vec![fixture(20, 2, 10, 11), fixture(21, 2, 12, 13)],
            prior_tips: Vec::new(),
        },
    );
    state
}

#[test]
fn sign_in_moves_to_tips_and_requests_data() {
    let mut state = AppState::default();
    let cmds = apply_delta(&mut state, Delta::SignedIn(user(1, "Alice")));
    assert_eq!(state.screen, Screen::Tips);
    assert_eq!(state.current_user().map(|u| u.id), Some(1));
    assert!(state.rounds_loading);
    assert_eq!(
        cmds,
        vec![
            ProviderCommand::LoadRoundsAndTeams,
            ProviderCommand::FetchLeaderboard,
            ProviderCommand::FetchGroups,
        ]
    );
}

#[test]
fn restored_session_behaves_like_sign_in() {
    let mut state = AppState::default();
    state.auth = AuthState::Authenticating;
    let cmds = apply_delta(&mut state, Delta::SessionRestored(Some(user(3, "Cat"))));
    assert_eq!(state.screen, Screen::Tips);
    assert_eq!(cmds.len(), 3);
}

#[test]
fn missing_session_shows_auth_and_fetches_teams_when_required() {
    let mut state = AppState::new(MarginMode::Exact, true);
    state.auth = AuthState::Authenticating;
    let cmds = apply_delta(&mut state, Delta::SessionRestored(None));
    assert_eq!(state.auth, AuthState::Anonymous);
    assert_eq!(state.screen, Screen::Auth);
    assert_eq!(cmds, vec![ProviderCommand::FetchTeams]);

    let mut relaxed = AppState::default();
    assert!(apply_delta(&mut relaxed, Delta::SessionRestored(None)).is_empty());
}

#[test]
fn auth_failure_surfaces_on_the_form() {
    let mut state = AppState::default();
    state.auth_form.email = "a@b.c".to_string();
    state.auth_form.password = "secret".to_string();
    assert!(matches!(
        state.submit_auth(),
        Some(ProviderCommand::Login { .. })
    ));
    assert_eq!(state.auth, AuthState::Authenticating);

    apply_delta(&mut state, Delta::AuthFailed("Invalid credentials".to_string()));
    assert_eq!(state.auth, AuthState::Anonymous);
    assert_eq!(state.auth_form.error.as_deref(), Some("Invalid credentials"));
    assert_eq!(state.screen, Screen::Auth);
}

#[test]
fn sign_up_validates_before_sending() {
    let mut state = AppState::new(MarginMode::Exact, true);
    state.auth_form.toggle_mode();
    assert_eq!(state.auth_form.mode, AuthMode::SignUp);
    state.auth_form.display_name = "Bob".to_string();
    state.auth_form.email = "bob@example.com".to_string();
    state.auth_form.password = "12345".to_string();
    assert!(state.submit_auth().is_none());
    assert!(state.auth_form.error.is_some());
    assert_eq!(state.auth, AuthState::Anonymous);

    state.auth_form.password = "123456".to_string();
    assert!(state.submit_auth().is_none());
    assert_eq!(
        state.auth_form.error.as_deref(),
        Some("Please pick your favourite team")
    );

    apply_delta(&mut state, Delta::SetTeams(vec![team(10, "Mowbray", "MOW")]));
    state.auth_form.cycle_favorite(state.teams.len(), true);
    match state.submit_auth() {
        Some(ProviderCommand::Register(reg)) => {
            assert_eq!(reg.favorite_team_id, Some(10));
            assert_eq!(reg.display_name, "Bob");
        }
        other => panic!("expected registration, got {other:?}"),
    }
}

#[test]
fn auth_focus_cycles_through_visible_fields() {
    let mut state = AppState::new(MarginMode::Exact, true);
    assert_eq!(state.auth_form.focus, AuthField::Email);
    state.auth_form.focus_next(true);
    assert_eq!(state.auth_form.focus, AuthField::Password);
    state.auth_form.focus_next(true);
    assert_eq!(state.auth_form.focus, AuthField::Email);

    state.auth_form.toggle_mode();
    state.auth_form.focus_prev(true);
    assert_eq!(state.auth_form.focus, AuthField::FavoriteTeam);
}

#[test]
fn rounds_arrival_selects_the_open_round() {
    let state = with_round_loaded(MarginMode::Exact);
    assert_eq!(state.selected_round, Some(2));
    assert!(state.can_tip());
    assert!(!state.round_loading);
    assert_eq!(state.fixtures.len(), 2);
    assert_eq!(state.teams.len(), 1);
    let chips = state.round_chips();
    assert!(chips[1].active);
}

#[test]
fn empty_round_list_selects_nothing() {
    let mut state = signed_in(MarginMode::Exact);
    let cmds = apply_delta(
        &mut state,
        Delta::RoundsAndTeams {
            rounds: Vec::new(),
            teams: Vec::new(),
        },
    );
    assert!(cmds.is_empty());
    assert!(state.selected_round.is_none());
    assert!(state.round_view().is_none());
}

#[test]
fn stale_round_loads_are_dropped() {
    let mut state = with_round_loaded(MarginMode::Exact);
    let first = state.select_round(1).unwrap();
    let second = state.select_round(2).unwrap();
    let (ProviderCommand::LoadRound { ticket: t1, .. }, ProviderCommand::LoadRound { ticket: t2, .. }) =
        (first, second)
    else {
        panic!("expected round loads");
    };
    assert!(t2 > t1);

    apply_delta(
        &mut state,
        Delta::RoundLoaded {
            ticket: t1,
            round_id: 1,
            fixtures: vec![fixture(10, 1, 10, 11)],
            prior_tips: Vec::new(),
        },
    );
    assert!(state.fixtures.is_empty());
    assert!(state.round_loading);
    assert!(state.logs.iter().any(|l| l.contains("stale")));

    apply_delta(
        &mut state,
        Delta::RoundLoaded {
            ticket: t2,
            round_id: 2,
            fixtures: vec![fixture(20, 2, 10, 11)],
            prior_tips: Vec::new(),
        },
    );
    assert_eq!(state.fixtures.len(), 1);
    assert!(!state.round_loading);
}

#[test]
fn stale_load_failure_is_silent() {
    let mut state = with_round_loaded(MarginMode::Exact);
    let old = state.round_ticket;
    state.select_round(1);
    apply_delta(
        &mut state,
        Delta::RoundLoadFailed {
            ticket: old,
            round_id: 2,
            message: "boom".to_string(),
        },
    );
    assert!(state.toast.is_none());
    assert!(state.round_loading);
}

#[test]
fn switching_rounds_discards_the_draft() {
    let mut state = with_round_loaded(MarginMode::Exact);
    assert!(state.pick_team(20, 10));
    assert_eq!(state.tips.len(), 1);
    state.cycle_round(false);
    assert_eq!(state.selected_round, Some(1));
    assert!(state.tips.is_empty());
    assert!(state.fixtures.is_empty());
}

#[test]
fn cycle_round_stops_at_the_ends() {
    let mut state = with_round_loaded(MarginMode::Exact);
    assert!(state.cycle_round(true).is_none());
    assert!(state.cycle_round(false).is_some());
    assert!(state.cycle_round(false).is_none());
}

#[test]
fn prior_tips_prefill_the_sheet() {
    let mut state = signed_in(MarginMode::Bucketed);
    let cmds = apply_delta(
        &mut state,
        Delta::RoundsAndTeams {
            rounds: vec![round(2, 2, RoundStatus::Open)],
            teams: Vec::new(),
        },
    );
    let Some(ProviderCommand::LoadRound { ticket, .. }) = cmds.first().cloned() else {
        panic!("expected a round load");
    };
    apply_delta(
        &mut state,
        Delta::RoundLoaded {
            ticket,
            round_id: 2,
            fixtures: vec![fixture(20, 2, 10, 11)],
            prior_tips: vec![PriorTip {
                fixture_id: 20,
                predicted_winner_id: 11,
                predicted_margin: 15,
                points_earned: None,
            }],
        },
    );
    let draft = state.tips.get(20).unwrap();
    assert_eq!(draft.winner_id, 11);
    assert_eq!(draft.margin, Margin::Bucket(MarginBucket::Blowout));
    let view = state.round_view().unwrap();
    assert!(view.fixtures[0].away.picked);
    assert!(view.submit.enabled);
}

#[test]
fn picks_are_limited_to_the_fixture_and_open_rounds() {
    let mut state = with_round_loaded(MarginMode::Exact);
    assert!(!state.pick_team(20, 99));
    assert!(!state.pick_team(99, 10));
    assert!(state.pick_team(20, 11));

    state.select_round(1);
    let ticket = state.round_ticket;
    apply_delta(
        &mut state,
        Delta::RoundLoaded {
            ticket,
            round_id: 1,
            fixtures: vec![fixture(10, 1, 10, 11)],
            prior_tips: Vec::new(),
        },
    );
    assert!(!state.can_tip());
    assert!(!state.pick_team(10, 10));
    assert!(!state.set_margin(10, Margin::Exact(3)));
    assert!(state.submit_tips().is_none());
}

#[test]
fn keyboard_pick_and_margin_flow() {
    let mut state = with_round_loaded(MarginMode::Exact);
    state.select_fixture_next();
    assert!(!state.step_margin(true));
    assert!(state.pick_side(false));
    assert!(state.step_margin(true));
    assert!(state.step_margin(true));
    assert_eq!(state.tips.get(21).unwrap().winner_id, 13);
    assert_eq!(state.tips.get(21).unwrap().margin, Margin::Exact(2));
    state.select_fixture_next();
    assert_eq!(state.fixture_cursor, 1);
}

#[test]
fn submit_sends_the_batch_once() {
    let mut state = with_round_loaded(MarginMode::Bucketed);
    assert!(state.submit_tips().is_none());

    state.pick_team(21, 12);
    state.pick_team(20, 10);
    state.set_margin(20, Margin::Bucket(MarginBucket::Draw));
    let Some(ProviderCommand::SubmitTips(batch)) = state.submit_tips() else {
        panic!("expected a submission");
    };
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].fixture_id, 20);
    assert_eq!(batch[0].predicted_margin, 0);
    assert_eq!(batch[1].predicted_margin, 7);
    assert!(state.submitting);
    assert!(state.submit_tips().is_none());

    apply_delta(&mut state, Delta::TipsSubmitted { count: 2 });
    assert!(!state.submitting);
    assert_eq!(
        state.toast.as_ref().map(|t| t.message.as_str()),
        Some("Tips locked in!")
    );
    assert_eq!(state.tips.len(), 2);
}

#[test]
fn submit_failure_keeps_the_draft() {
    let mut state = with_round_loaded(MarginMode::Exact);
    state.pick_team(20, 10);
    state.submit_tips();
    apply_delta(&mut state, Delta::TipsSubmitFailed("Round is closed".to_string()));
    assert!(!state.submitting);
    assert_eq!(state.tips.len(), 1);
    assert_eq!(
        state.toast.as_ref().map(|t| t.message.as_str()),
        Some("Error: Round is closed")
    );
}

#[test]
fn navigation_requires_a_user_and_refreshes() {
    let mut anon = AppState::default();
    assert!(anon.open_screen(Screen::Leaderboard).is_none());
    assert_eq!(anon.screen, Screen::Auth);

    let mut state = signed_in(MarginMode::Exact);
    assert_eq!(
        state.open_screen(Screen::Leaderboard),
        Some(ProviderCommand::FetchLeaderboard)
    );
    assert_eq!(
        state.open_screen(Screen::Groups),
        Some(ProviderCommand::FetchGroups)
    );
    assert!(state.open_screen(Screen::Tips).is_none());
    assert_eq!(state.screen, Screen::Tips);
}

#[test]
fn leaderboard_summary_tracks_the_signed_in_user() {
    let mut state = signed_in(MarginMode::Exact);
    assert_eq!(state.personal_summary().rank, None);
    apply_delta(
        &mut state,
        Delta::SetLeaderboard(vec![
            board_row(4, "Dan", 30, 9, 10),
            board_row(1, "Alice", 21, 7, 10),
        ]),
    );
    let summary = state.personal_summary();
    assert_eq!(summary.rank, Some(2));
    assert_eq!(summary.points, 21);
    let lines = state.leaderboard_lines();
    assert!(lines[1].is_me);
    assert!(!lines[0].is_me);
}

#[test]
fn group_create_and_join_refresh_the_list() {
    let mut state = signed_in(MarginMode::Exact);
    state.open_screen(Screen::Groups);

    state.begin_prompt(PromptKind::GroupName);
    state.prompt.as_mut().unwrap().input = "  ".to_string();
    assert!(state.submit_prompt().is_none());
    assert!(state.prompt.is_none());

    state.begin_prompt(PromptKind::GroupName);
    state.prompt.as_mut().unwrap().input = "Office".to_string();
    assert_eq!(
        state.submit_prompt(),
        Some(ProviderCommand::CreateGroup {
            name: "Office".to_string()
        })
    );
    let cmds = apply_delta(
        &mut state,
        Delta::GroupCreated(CreatedGroup {
            id: 5,
            name: "Office".to_string(),
            code: "XYZ789".to_string(),
        }),
    );
    assert_eq!(cmds, vec![ProviderCommand::FetchGroups]);
    assert_eq!(
        state.toast.as_ref().map(|t| t.message.as_str()),
        Some("Group created! Code: XYZ789")
    );

    state.begin_prompt(PromptKind::GroupCode);
    state.prompt.as_mut().unwrap().input = "ABC123".to_string();
    assert_eq!(
        state.submit_prompt(),
        Some(ProviderCommand::JoinGroup {
            code: "ABC123".to_string()
        })
    );
    let cmds = apply_delta(&mut state, Delta::GroupJoined);
    assert_eq!(cmds, vec![ProviderCommand::FetchGroups]);
    assert_eq!(
        state.toast.as_ref().map(|t| t.message.as_str()),
        Some("Joined group!")
    );
}

#[test]
fn group_board_opens_for_the_selected_group() {
    let mut state = signed_in(MarginMode::Exact);
    apply_delta(
        &mut state,
        Delta::SetGroups(vec![
            Group {
                id: 5,
                name: "Office".to_string(),
                code: "ABC123".to_string(),
                member_count: 1,
            },
            Group {
                id: 6,
                name: "Family".to_string(),
                code: "FAM001".to_string(),
                member_count: 4,
            },
        ]),
    );
    state.select_group_next();
    state.select_group_next();
    assert_eq!(state.group_cursor, 1);
    assert_eq!(
        state.open_selected_group(),
        Some(ProviderCommand::FetchGroupLeaderboard { group_id: 6 })
    );
    assert_eq!(state.screen, Screen::GroupBoard);

    apply_delta(
        &mut state,
        Delta::SetGroupLeaderboard {
            group_id: 5,
            rows: vec![board_row(1, "Alice", 3, 1, 1)],
        },
    );
    assert!(state.group_board.as_ref().unwrap().loading);

    apply_delta(
        &mut state,
        Delta::SetGroupLeaderboard {
            group_id: 6,
            rows: vec![board_row(1, "Alice", 3, 1, 1)],
        },
    );
    let board = state.group_board.as_ref().unwrap();
    assert!(!board.loading);
    assert_eq!(board.rows.len(), 1);

    assert_eq!(
        state.close_group_board(),
        Some(ProviderCommand::FetchGroups)
    );
    assert!(state.group_board.is_none());
    assert_eq!(state.screen, Screen::Groups);

    let cards = state.group_cards();
    assert_eq!(cards[0].members_label, "1 member");
    assert_eq!(cards[1].members_label, "4 members");
}

#[test]
fn logout_clears_the_session_but_keeps_branding() {
    let mut state = with_round_loaded(MarginMode::Exact);
    apply_delta(&mut state, Delta::SetBranding("Club Tips".to_string()));
    state.pick_team(20, 10);
    let ticket = state.round_ticket;

    assert_eq!(state.logout(), ProviderCommand::Logout);
    assert_eq!(state.screen, Screen::Auth);
    assert!(state.current_user().is_none());
    assert!(state.rounds.is_empty());
    assert!(state.tips.is_empty());
    assert!(state.leaderboard.is_empty());
    assert_eq!(state.branding, "Club Tips");
    assert!(state.round_ticket > ticket);

    // Late results from the old session are ignored.
    apply_delta(&mut state, Delta::SetLeaderboard(vec![board_row(1, "Alice", 1, 1, 1)]));
    apply_delta(
        &mut state,
        Delta::RoundLoaded {
            ticket,
            round_id: 2,
            fixtures: vec![fixture(20, 2, 10, 11)],
            prior_tips: Vec::new(),
        },
    );
    assert!(state.leaderboard.is_empty());
    assert!(state.fixtures.is_empty());
}

#[test]
fn blank_branding_is_ignored() {
    let mut state = AppState::default();
    apply_delta(&mut state, Delta::SetBranding("   ".to_string()));
    assert_eq!(state.branding, DEFAULT_BRANDING);
}

#[test]
fn request_failures_show_an_error_toast() {
    let mut state = signed_in(MarginMode::Exact);
    apply_delta(&mut state, Delta::RequestFailed("Invalid code".to_string()));
    assert_eq!(
        state.toast.as_ref().map(|t| t.message.as_str()),
        Some("Error: Invalid code")
    );
    assert!(state.logs.iter().any(|l| l.contains("Invalid code")));
}

#[test]
fn expired_session_returns_to_sign_in() {
    let mut state = with_round_loaded(MarginMode::Exact);
    state.pick_team(20, 10);
    let ticket = state.round_ticket;

    let cmds = apply_delta(
        &mut state,
        Delta::SessionExpired("Not authenticated".to_string()),
    );
    assert!(cmds.is_empty());
    assert_eq!(state.auth, AuthState::Anonymous);
    assert_eq!(state.screen, Screen::Auth);
    assert!(state.tips.is_empty());
    assert!(state.rounds.is_empty());
    assert!(state.round_ticket > ticket);
    assert_eq!(state.auth_form.error.as_deref(), Some("Not authenticated"));
    assert!(state.logs.iter().any(|l| l.contains("Session expired")));

    // A second rejection from a request already in flight changes nothing.
    state.auth_form.email = "alice@example.com".to_string();
    apply_delta(&mut state, Delta::SessionExpired("Invalid token".to_string()));
    assert_eq!(state.auth_form.error.as_deref(), Some("Not authenticated"));
    assert_eq!(state.auth_form.email, "alice@example.com");
}

#[test]
fn unrelated_failures_leave_the_group_board_loading() {
    let mut state = signed_in(MarginMode::Exact);
    apply_delta(
        &mut state,
        Delta::SetGroups(vec![Group {
            id: 6,
            name: "Family".to_string(),
            code: "FAM001".to_string(),
            member_count: 4,
        }]),
    );
    state.open_selected_group();

    apply_delta(&mut state, Delta::RequestFailed("Database unavailable".to_string()));
    assert!(state.group_board.as_ref().unwrap().loading);

    apply_delta(
        &mut state,
        Delta::GroupLeaderboardFailed {
            group_id: 5,
            message: "Not a member".to_string(),
        },
    );
    assert!(state.group_board.as_ref().unwrap().loading);

    apply_delta(
        &mut state,
        Delta::GroupLeaderboardFailed {
            group_id: 6,
            message: "Not a member".to_string(),
        },
    );
    assert!(!state.group_board.as_ref().unwrap().loading);
    assert_eq!(
        state.toast.as_ref().map(|t| t.message.as_str()),
        Some("Error: Not a member")
    );
}

#[test]
fn toasts_expire_after_the_configured_time() {
    let mut state = AppState::default();
    state.show_toast("Joined group!");
    let shown = state.toast.as_ref().unwrap().shown_at;
    state.expire_toast(shown + std::time::Duration::from_secs(1), 3);
    assert!(state.toast.is_some());
    state.expire_toast(shown + std::time::Duration::from_secs(3), 3);
    assert!(state.toast.is_none());
}

#[test]
fn log_buffer_is_bounded() {
    let mut state = AppState::default();
    for i in 0..250 {
        state.push_log(format!("[INFO] line {i}"));
    }
    assert_eq!(state.logs.len(), 200);
    assert_eq!(state.logs.front().map(String::as_str), Some("[INFO] line 50"));
}
