use budgetfolio::domain::models::{ComponentFamily, EstimatorConfig, OutcomeKind};
use budgetfolio::services::{KnapsackPlanner, MixtureEstimator, WorldModel};
use budgetfolio::{Action, BudgetLadder, CountArray, Outcome, RecordedRun};
use proptest::prelude::*;

mod common;

fn world(nsolvers: usize, rungs: usize) -> WorldModel {
    let solvers = (0..nsolvers).map(|i| format!("s{i}")).collect();
    WorldModel::new(solvers, BudgetLadder::uniform(10.0, rungs).unwrap()).unwrap()
}

fn outcome_kind() -> impl Strategy<Value = OutcomeKind> {
    prop_oneof![
        Just(OutcomeKind::Unsolved),
        Just(OutcomeKind::Positive),
        Just(OutcomeKind::Negative),
    ]
}

proptest! {
    /// Property: more budget never lowers the planned success probability
    #[test]
    fn prop_knapsack_value_monotone_in_budget(
        rates in prop::collection::vec(0.0f64..1.0, 6),
        remaining in 0.0f64..80.0,
        extra in 0.0f64..40.0,
    ) {
        let world = world(2, 3);
        let planner = KnapsackPlanner::new();
        let small = planner.solve(&world, &rates, remaining).unwrap();
        let large = planner.solve(&world, &rates, remaining + extra).unwrap();
        let fail_small = small.value.last().copied().unwrap();
        let fail_large = large.value.last().copied().unwrap();
        prop_assert!(fail_large <= fail_small + 1e-12);
    }

    /// Property: a knapsack plan never costs more than the remaining budget
    #[test]
    fn prop_knapsack_plan_fits(
        rates in prop::collection::vec(0.0f64..1.0, 8),
        remaining in 0.0f64..100.0,
    ) {
        let world = world(2, 4);
        let plan = KnapsackPlanner::new().plan(&world, &rates, remaining).unwrap();
        let total: f64 = plan.iter().map(|p| p.action.cost()).sum();
        prop_assert!(total <= remaining + 1e-9);
    }

    /// Property: counting is independent of event order
    #[test]
    fn prop_counts_ignore_event_order(
        events in prop::collection::vec((0usize..2, 0usize..3, outcome_kind()), 0..30),
    ) {
        let world = world(2, 3);
        let events: Vec<(Action, OutcomeKind)> = events
            .into_iter()
            .map(|(s, r, k)| (world.action(world.index(s, r)), k))
            .collect();
        let mut reversed = events.clone();
        reversed.reverse();
        prop_assert_eq!(
            world.counts_from_events(&events).unwrap(),
            world.counts_from_events(&reversed).unwrap()
        );
    }

    /// Property: a recorded run never contributes beyond its own budget
    #[test]
    fn prop_censored_rungs_untouched(
        budget_rungs in 1usize..4,
        cost in 0.0f64..40.0,
        solved in any::<bool>(),
    ) {
        let world = world(1, 4);
        let run = RecordedRun {
            task_id: "t".to_string(),
            solver: "s0".to_string(),
            budget: 10.0 * budget_rungs as f64,
            cost,
            outcome: if solved { Outcome::positive(None) } else { Outcome::unsolved() },
        };
        let counts = world.counts_from_runs(&[run]).unwrap();
        for rung in 0..4 {
            let expected = u32::from(rung < budget_rungs);
            prop_assert_eq!(counts.total(rung), expected);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: fitted mixtures always carry simplex weights and posteriors
    #[test]
    fn prop_em_weights_on_simplex(
        rows in prop::collection::vec(prop::collection::vec(1u32..4, 6), 1..6),
        components in 1usize..4,
        seed in any::<u64>(),
        dcm in any::<bool>(),
    ) {
        let training: Vec<CountArray> = rows
            .iter()
            .map(|r| CountArray::from_rows(&[r[0..3].to_vec(), r[3..6].to_vec()]).unwrap())
            .collect();
        let config = EstimatorConfig {
            family: if dcm { ComponentFamily::Dcm } else { ComponentFamily::Multinomial },
            components,
            restarts: 2,
            max_iterations: 16,
            seed: Some(seed),
            ..EstimatorConfig::default()
        };
        let model = MixtureEstimator::new(config).estimate(&training).unwrap();
        let total: f64 = model.weights().iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-6);
        prop_assert!(model.ncomponents() <= training.len());

        let posterior = model.posterior(&training[0]);
        let total: f64 = posterior.iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-6);
        prop_assert!(posterior.iter().all(|w| *w >= 0.0));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: a modeling strategy never selects an action it cannot afford
    #[test]
    fn prop_strategy_never_exceeds_remaining(
        budget in 0.0f64..60.0,
        outcomes in prop::collection::vec(outcome_kind(), 8),
    ) {
        let portfolio = common::confident_portfolio(3);
        let mut strategy = portfolio.start_session("t");
        let mut remaining = budget;
        for kind in outcomes {
            let Some(action) = strategy.select(remaining).unwrap() else {
                break;
            };
            prop_assert!(action.cost() <= remaining + 1e-9);
            remaining -= action.cost();
            strategy.observe(&action, &Outcome::from(kind)).unwrap();
        }
    }
}
