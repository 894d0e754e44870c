use std::sync::Arc;
use std::thread;

use guess_core::model::KnowledgeBase;
use guess_core::policy::{ConfidenceRule, DecisionPolicy, Phase};
use guess_core::store::{MemoryStore, MemorySuggestions};
use guess_core::{Engine, EngineConfig, GameError, SessionId, SessionRegistry, Turn};

const YES: usize = 0;
const NO: usize = 4;

fn animals() -> KnowledgeBase {
    KnowledgeBase::new(
        vec!["Chat".into(), "Chien".into(), "Poisson".into()],
        vec![1, 1, 1],
        vec!["Miaule-t-il ?".into(), "Aboie-t-il ?".into()],
        vec![vec![0.9, 0.1, 0.5], vec![0.2, 0.8, 0.5]],
    )
    .expect("valid knowledge base")
}

fn engine_with(
    config: EngineConfig,
) -> (Arc<Engine>, Arc<MemoryStore>, Arc<MemorySuggestions>) {
    let store = Arc::new(MemoryStore::new(animals()));
    let suggestions = Arc::new(MemorySuggestions::new());
    let engine = Engine::load(config, store.clone(), suggestions.clone()).expect("engine loads");
    (Arc::new(engine), store, suggestions)
}

fn absolute(threshold: f64) -> EngineConfig {
    EngineConfig {
        policy: DecisionPolicy {
            rule: ConfidenceRule::Absolute { threshold },
            ..DecisionPolicy::default()
        },
        ..EngineConfig::default()
    }
}

#[test]
fn first_question_minimises_expected_entropy() {
    let (engine, _, _) = engine_with(EngineConfig::default());
    let (session, opening) = engine.begin();
    assert_eq!(opening.question_index, 0);
    assert_eq!(opening.question, "Miaule-t-il ?");
    assert_eq!(opening.ordinal, 1);
    assert_eq!(opening.scale.len(), 5);
    assert_eq!(session.asked(), &[true, false]);
}

#[test]
fn yes_on_first_question_makes_first_candidate_most_probable() {
    let (engine, _, _) = engine_with(EngineConfig::default());
    let (mut session, _) = engine.begin();
    let turn = engine.submit_answer(&mut session, YES).expect("answer accepted");

    let probs = session.belief().probabilities();
    assert!((probs[0] - 0.6).abs() < 1e-4);
    assert!((probs[1] - 0.0667).abs() < 1e-3);
    assert!((probs[2] - 0.3333).abs() < 1e-3);

    // 0.6 - 0.333 does not clear the 0.3 margin, so the engine keeps asking.
    assert_eq!(
        turn,
        Turn::Question {
            text: "Aboie-t-il ?".into(),
            index: 1,
            ordinal: 2,
        }
    );
}

#[test]
fn confident_guess_then_confirmation_teaches_knowledge_base() {
    let (engine, store, _) = engine_with(EngineConfig::default());
    let (mut session, _) = engine.begin();
    engine.submit_answer(&mut session, YES).unwrap();
    let turn = engine.submit_answer(&mut session, NO).unwrap();
    assert!(matches!(
        turn,
        Turn::Guess { ref candidate, index: 0, forced: false, .. } if candidate == "Chat"
    ));

    let turn = engine.confirm(&mut session, true).unwrap();
    assert_eq!(
        turn,
        Turn::Confirmed {
            candidate: "Chat".into(),
            persisted: true,
        }
    );

    let kb = engine.knowledge();
    assert!((kb.expected(0, 0) - 0.91).abs() < 1e-12);
    assert!((kb.expected(1, 0) - 0.18).abs() < 1e-12);
    assert_eq!(kb.appearances(), &[2, 1, 1]);
    assert_eq!(kb.row(0)[1..], [0.1, 0.5]);
    assert_eq!(store.persist_count(), 1);
    assert_eq!(store.current().map(|kb| kb.appearances().to_vec()), Some(vec![2, 1, 1]));
}

#[test]
fn confirming_after_single_answer_only_touches_answered_cell() {
    let (engine, _, _) = engine_with(absolute(0.55));
    let (mut session, _) = engine.begin();
    let turn = engine.submit_answer(&mut session, YES).unwrap();
    assert!(matches!(turn, Turn::Guess { index: 0, .. }));

    engine.confirm(&mut session, true).unwrap();
    let kb = engine.knowledge();
    assert!((kb.expected(0, 0) - 0.91).abs() < 1e-12);
    assert_eq!(kb.expected(1, 0), 0.2);
    assert_eq!(kb.appearances()[0], 2);
}

#[test]
fn escalation_fires_on_third_rejection() {
    let (engine, store, suggestions) = engine_with(EngineConfig::default());
    let (mut session, _) = engine.begin();
    engine.submit_answer(&mut session, YES).unwrap();
    let first = engine.submit_answer(&mut session, YES).unwrap();
    assert!(matches!(first, Turn::Guess { index: 2, forced: true, .. }));
    assert_eq!(session.pending_guess(), Some(2));

    let second = engine.confirm(&mut session, false).unwrap();
    assert!(matches!(second, Turn::Guess { index: 0, forced: true, .. }));
    assert_eq!(session.failures(), 1);

    let third = engine.confirm(&mut session, false).unwrap();
    assert!(matches!(third, Turn::Guess { index: 1, forced: true, .. }));
    assert_eq!(session.failures(), 2);

    let escalated = engine.confirm(&mut session, false).unwrap();
    assert_eq!(escalated, Turn::SuggestionRequired);
    assert_eq!(session.failures(), 3);
    assert_eq!(session.phase(), Phase::SuggestionRequired);
    assert_eq!(session.pending_guess(), None);

    let ack = engine
        .contribute_suggestion(&mut session, " Lapin ", "A-t-il de longues oreilles ?")
        .unwrap();
    assert!(ack.recorded);
    assert_eq!(session.phase(), Phase::Closed);

    let recorded = suggestions.snapshot();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].candidate, "Lapin");
    assert_eq!(store.persist_count(), 0, "rejections never touch shared knowledge");
    assert_eq!(engine.knowledge().appearances(), &[1, 1, 1]);
}

#[test]
fn rejected_candidate_is_excluded_while_questions_remain() {
    let (engine, _, _) = engine_with(absolute(0.55));
    let (mut session, _) = engine.begin();
    engine.submit_answer(&mut session, YES).unwrap();
    let turn = engine.confirm(&mut session, false).unwrap();
    assert!(matches!(turn, Turn::Question { index: 1, ordinal: 2, .. }));
    assert_eq!(session.belief().probability(0), 0.0);
    assert!(session.belief().is_excluded(0));
    let total: f64 = session.belief().probabilities().iter().sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn validation_errors_leave_session_untouched() {
    let (engine, _, _) = engine_with(EngineConfig::default());
    let (mut session, _) = engine.begin();
    let before = session.belief().clone();

    let err = engine.submit_answer(&mut session, 5).unwrap_err();
    assert!(matches!(
        err,
        GameError::InvalidAnswerIndex { index: 5, scale_size: 5 }
    ));
    assert!(matches!(
        engine.confirm(&mut session, true),
        Err(GameError::NoGuessPending)
    ));
    assert!(matches!(
        engine.contribute_suggestion(&mut session, "x", "y"),
        Err(GameError::SuggestionNotRequested)
    ));
    assert_eq!(session.belief(), &before);
    assert!(session.history().is_empty());
    assert_eq!(session.ordinal(), 1);
}

#[test]
fn answering_while_guess_pending_is_rejected() {
    let (engine, _, _) = engine_with(absolute(0.55));
    let (mut session, _) = engine.begin();
    engine.submit_answer(&mut session, YES).unwrap();
    assert!(matches!(
        engine.submit_answer(&mut session, YES),
        Err(GameError::AwaitingConfirmation)
    ));
    engine.confirm(&mut session, true).unwrap();
    assert!(matches!(
        engine.confirm(&mut session, true),
        Err(GameError::SessionFinished)
    ));
}

#[test]
fn persistence_failure_keeps_learning_update() {
    let (engine, store, _) = engine_with(absolute(0.55));
    store.fail_persist(true);
    let (mut session, _) = engine.begin();
    engine.submit_answer(&mut session, YES).unwrap();
    let turn = engine.confirm(&mut session, true).unwrap();
    assert_eq!(
        turn,
        Turn::Confirmed {
            candidate: "Chat".into(),
            persisted: false,
        }
    );
    assert_eq!(engine.knowledge().appearances()[0], 2);
    assert_eq!(store.current().map(|kb| kb.appearances()[0]), Some(1));
}

#[test]
fn suggestion_failure_is_not_fatal() {
    let (engine, _, suggestions) = engine_with(EngineConfig::default());
    suggestions.fail_record(true);
    let (mut session, _) = engine.begin();
    engine.submit_answer(&mut session, YES).unwrap();
    engine.submit_answer(&mut session, YES).unwrap();
    for _ in 0..3 {
        engine.confirm(&mut session, false).unwrap();
    }
    let ack = engine
        .contribute_suggestion(&mut session, "Lapin", "Saute-t-il ?")
        .unwrap();
    assert!(!ack.recorded);
    assert_eq!(session.phase(), Phase::Closed);
}

#[test]
fn missing_knowledge_is_data_unavailable() {
    let result = Engine::load(
        EngineConfig::default(),
        Arc::new(MemoryStore::empty()),
        Arc::new(MemorySuggestions::new()),
    );
    assert!(matches!(result, Err(GameError::DataUnavailable(_))));
}

#[test]
fn identical_answers_give_identical_games() {
    let play = || {
        let (engine, _, _) = engine_with(EngineConfig::default());
        let (mut session, opening) = engine.begin();
        let mut transcript = vec![format!("{:?}", opening.question_index)];
        for answer in [YES, YES] {
            let turn = engine.submit_answer(&mut session, answer).unwrap();
            transcript.push(format!("{turn:?}"));
        }
        transcript.push(format!("{:?}", engine.confirm(&mut session, false).unwrap()));
        transcript
    };
    assert_eq!(play(), play());
}

#[test]
fn registry_routes_by_session_id_and_forgets_finished_games() {
    let (engine, _, _) = engine_with(absolute(0.55));
    let registry = SessionRegistry::new(engine);
    let (id, opening) = registry.begin();
    assert_eq!(opening.ordinal, 1);
    assert_eq!(registry.len(), 1);

    let unknown = SessionId::random();
    assert!(matches!(
        registry.submit_answer(unknown, YES),
        Err(GameError::UnknownSession(missing)) if missing == unknown
    ));

    registry.submit_answer(id, YES).unwrap();
    registry.confirm(id, true).unwrap();
    assert!(registry.is_empty());
    assert!(matches!(
        registry.confirm(id, true),
        Err(GameError::UnknownSession(_))
    ));
}

#[test]
fn abandoning_a_session_is_side_effect_free() {
    let (engine, store, _) = engine_with(EngineConfig::default());
    let registry = SessionRegistry::new(engine.clone());
    let (id, _) = registry.begin();
    registry.submit_answer(id, YES).unwrap();
    assert!(registry.abandon(id));
    assert_eq!(store.persist_count(), 0);
    assert_eq!(engine.knowledge().appearances(), &[1, 1, 1]);
}

#[test]
fn concurrent_confirmations_are_serialised() {
    let (engine, store, _) = engine_with(absolute(0.55));
    let registry = Arc::new(SessionRegistry::new(engine.clone()));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..10 {
                    let (id, _) = registry.begin();
                    registry.submit_answer(id, YES).expect("answer");
                    registry.confirm(id, true).expect("confirm");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("session thread");
    }
    assert_eq!(engine.knowledge().appearances()[0], 81);
    assert_eq!(store.persist_count(), 80);
    assert_eq!(store.current().map(|kb| kb.appearances()[0]), Some(81));
}
