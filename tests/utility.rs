// tests/utility.rs
use schelling_balance::mechanics::{Formula, Fraction, UtilityFunction};
use schelling_balance::{ConfigError, SimConfig, Simulation, settle};

fn at(u: &UtilityFunction, num: u32, den: u32) -> f64 {
    u.evaluate(Fraction::new(num, den))
}

/* ──────────────────────────────────────────────────────────────────────────
1) Built-in shapes at their corners
────────────────────────────────────────────────────────────────────────── */

#[test]
fn single_peaked_is_zero_at_the_ends_and_one_at_the_peak() {
    let u = UtilityFunction::SinglePeaked { peak: 0.5 };
    assert_eq!(u.evaluate(Fraction::ZERO), 0.0);
    assert_eq!(at(&u, 1, 2), 1.0);
    assert_eq!(u.evaluate(Fraction::ONE), 0.0);
    assert_eq!(at(&u, 1, 4), 0.5);
}

#[test]
fn threshold_caps_at_tau() {
    let u = UtilityFunction::Threshold { tau: 0.7 };
    assert_eq!(at(&u, 9, 10), 0.7);
    assert_eq!(u.evaluate(Fraction::ONE), 0.7);
    assert_eq!(at(&u, 1, 2), 0.5);
}

#[test]
fn threshold_without_full_segregation_punishes_a_uniform_neighborhood() {
    let u = UtilityFunction::ThresholdNoFullSegregation { tau: 0.7 };
    assert_eq!(u.evaluate(Fraction::ONE), 0.0);
    assert_eq!(at(&u, 9, 10), 0.7);
    // No occupied neighbors reads as similarity zero, not one.
    assert_eq!(u.evaluate(Fraction::similarity(0, 0)), 0.0);
}

#[test]
fn rectangular_band_is_closed() {
    let u = UtilityFunction::Rectangular { left: 0.25, right: 0.75 };
    assert_eq!(at(&u, 9, 20), 1.0);
    assert_eq!(at(&u, 1, 4), 1.0);
    assert_eq!(at(&u, 3, 4), 1.0);
    assert_eq!(at(&u, 1, 5), 0.0);
    assert_eq!(at(&u, 4, 5), 0.0);

    let narrow = UtilityFunction::Rectangular { left: 0.3, right: 0.6 };
    assert_eq!(at(&narrow, 9, 20), 1.0);
    assert_eq!(at(&narrow, 1, 5), 0.0);
}

#[test]
fn trapezoid_ramps_on_both_sides() {
    let u = UtilityFunction::Trapezoidal { left: 0.25, right: 0.75 };
    assert_eq!(at(&u, 1, 8), 0.5);
    assert_eq!(at(&u, 1, 2), 1.0);
    assert_eq!(at(&u, 7, 8), 0.5);
    assert_eq!(u.evaluate(Fraction::ONE), 0.0);
}

#[test]
fn central_rectangle_is_centered_on_one_half() {
    let u = UtilityFunction::CentralRectangular { size: 0.5 };
    assert_eq!(at(&u, 1, 2), 1.0);
    assert_eq!(at(&u, 3, 8), 1.0);
    assert_eq!(at(&u, 1, 8), 0.0);
    assert_eq!(at(&u, 7, 8), 0.0);
}

#[test]
fn out_of_range_parameters_fail_validation() {
    let bad = [
        UtilityFunction::SinglePeaked { peak: 0.0 },
        UtilityFunction::Threshold { tau: 1.5 },
        UtilityFunction::Trapezoidal { left: 0.8, right: 0.2 },
        UtilityFunction::Rectangular { left: -0.1, right: 0.5 },
        UtilityFunction::CentralRectangular { size: 2.0 },
    ];
    for u in bad {
        assert!(matches!(u.validate(), Err(ConfigError::InvalidUtility(_))), "{u:?}");
    }
    assert!(UtilityFunction::expression("frac").validate().is_ok());
}

/* ──────────────────────────────────────────────────────────────────────────
2) Custom utilities
────────────────────────────────────────────────────────────────────────── */

#[test]
fn expression_utility_evaluates_the_formula() {
    let u = UtilityFunction::expression("min(frac, 0.5)");
    assert_eq!(at(&u, 3, 4), 0.5);
    assert_eq!(at(&u, 1, 4), 0.25);

    let tent = UtilityFunction::expression("1 - abs(2*frac - 1)");
    assert_eq!(at(&tent, 1, 2), 1.0);
    assert_eq!(at(&tent, 1, 4), 0.5);
}

#[test]
fn failing_formulas_read_as_zero() {
    for src in ["import os", "frac +", "__import__(frac)", "open(frac)", "frac\n1"] {
        let u = UtilityFunction::expression(src);
        assert_eq!(at(&u, 1, 2), 0.0, "{src}");
    }
    let recip = UtilityFunction::expression("1 / frac");
    assert_eq!(recip.evaluate(Fraction::ZERO), 0.0);
    assert_eq!(at(&recip, 1, 2), 2.0);
}

#[test]
fn runaway_formulas_read_as_zero_instead_of_crashing() {
    let nested = format!("{}frac{}", "(".repeat(10_000), ")".repeat(10_000));
    let negated = format!("{}frac", "-".repeat(200_000));
    let sum = vec!["frac"; 200_000].join("+");
    for src in [nested, negated, sum] {
        let u = UtilityFunction::expression(&src);
        assert_eq!(at(&u, 1, 2), 0.0);
    }
    // Moderate nesting still evaluates.
    let fine = format!("{}frac{}", "(".repeat(100), ")".repeat(100));
    assert_eq!(at(&UtilityFunction::expression(&fine), 1, 2), 0.5);
}

#[test]
fn bands_test_the_exact_fraction() {
    // 0.6 is stored just below 3/5 and 0.3 just below 3/10.
    let u = UtilityFunction::Rectangular { left: 0.3, right: 0.6 };
    assert_eq!(at(&u, 3, 5), 0.0);
    assert_eq!(at(&u, 3, 10), 1.0);
    let central = UtilityFunction::CentralRectangular { size: 0.5 };
    assert_eq!(at(&central, 1, 4), 1.0);
    assert_eq!(at(&central, 3, 4), 1.0);
}

#[test]
fn closures_that_give_up_read_as_zero() {
    let none = UtilityFunction::custom(|_| None);
    let nan = UtilityFunction::custom(|_| Some(f64::NAN));
    let square = UtilityFunction::custom(|f| Some(f * f));
    assert_eq!(at(&none, 1, 2), 0.0);
    assert_eq!(at(&nan, 1, 2), 0.0);
    assert_eq!(at(&square, 1, 2), 0.25);
}

#[test]
fn formulas_follow_python_arithmetic() {
    let eval = |src: &str, frac: f64| Formula::parse(src).and_then(|f| f.eval(frac));
    assert_eq!(eval("-2 ** 2", 0.0), Ok(-4.0));
    assert_eq!(eval("2 ** 3 ** 2", 0.0), Ok(512.0));
    assert_eq!(eval("-7 // 2", 0.0), Ok(-4.0));
    assert_eq!(eval("-7 % 3", 0.0), Ok(2.0));
    assert_eq!(eval("max(frac, 1 - frac)", 0.25), Ok(0.75));
    assert!(eval("exec(frac)", 0.5).is_err());
}

#[test]
fn a_broken_formula_freezes_the_simulation_at_once() {
    // Every agent scores 0 everywhere, so nobody can improve.
    let mut sim = Simulation::configure(SimConfig::jump(6, 6).with_seed(2), UtilityFunction::expression("import os")).unwrap();
    let out = settle(&mut sim, 10);
    assert!(out.equilibrium);
    assert_eq!(out.moves, 0);
}
