//! Property-based tests for ledger invariants
//!
//! Random operation sequences over a handful of accounts, replayed
//! sequentially, must:
//! - conserve money: Σ(balances) == Σ(accepted deposits)
//! - never leave a balance negative
//! - produce the same balances under every strategy

use ledger_engine::replay::worker;
use ledger_engine::{LedgerEngine, Operation, StrategyType};
use proptest::prelude::*;

const ACCOUNTS: [&str; 4] = ["alpha", "bravo", "charlie", "delta"];

/// Strategy for generating account ids, mostly known, sometimes invalid
fn account_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        8 => prop::sample::select(ACCOUNTS.to_vec()).prop_map(str::to_string),
        1 => Just("ghost".to_string()),
        1 => Just(String::new()),
    ]
}

/// Strategy for generating amounts, including refused ones
fn amount_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![
        8 => 1i64..200,
        1 => Just(0i64),
        1 => -50i64..0,
    ]
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        1 => account_strategy().prop_map(|account| Operation::Create { account }),
        3 => (account_strategy(), amount_strategy())
            .prop_map(|(account, amount)| Operation::Deposit { account, amount }),
        6 => (account_strategy(), account_strategy(), amount_strategy())
            .prop_map(|(from, to, amount)| Operation::Transfer { from, to, amount }),
    ]
}

/// Replay `operations` in order and return the final balances and the
/// sum of accepted deposits
fn replay(strategy: StrategyType, operations: &[Operation]) -> (Vec<(String, i64)>, i128) {
    let engine = LedgerEngine::new(strategy);
    engine.start().unwrap();

    let mut tally = worker::Tally::default();
    for operation in operations {
        let applied = worker::execute(&engine, operation).unwrap();
        tally.record(operation, applied);
    }

    let balances = engine
        .accounts()
        .unwrap()
        .into_iter()
        .map(|account| (account.id, account.balance))
        .collect();
    engine.shutdown().unwrap();
    (balances, tally.deposited)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_money_is_conserved(
        operations in prop::collection::vec(operation_strategy(), 0..60)
    ) {
        for strategy in StrategyType::ALL {
            let (balances, deposited) = replay(strategy, &operations);
            let total: i128 = balances.iter().map(|(_, b)| i128::from(*b)).sum();
            prop_assert_eq!(total, deposited, "strategy {}", strategy);
            prop_assert!(
                balances.iter().all(|(_, b)| *b >= 0),
                "negative balance under {}",
                strategy
            );
        }
    }

    #[test]
    fn prop_strategies_agree_on_sequential_replay(
        operations in prop::collection::vec(operation_strategy(), 0..60)
    ) {
        let (reference, _) = replay(StrategyType::Mutex, &operations);
        for strategy in StrategyType::ALL {
            let (balances, _) = replay(strategy, &operations);
            prop_assert_eq!(&balances, &reference, "strategy {}", strategy);
        }
    }
}
