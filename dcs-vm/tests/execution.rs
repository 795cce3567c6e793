//! End-to-end STEP-table scenarios: build a parameter record, run one or
//! more cycles, assert the visible parameter values.

use dcs_vm::calc::{Calc, CalcError, CalcParameters, ParamId};
use dcs_vm::signal::{Real, Value};
use quickcheck_macros::quickcheck;
use rstest::rstest;

fn with_steps(parameters: &mut CalcParameters, steps: &[(usize, &str)]) {
    for (number, source) in steps {
        parameters.set_step(*number, source);
    }
}

fn run(parameters: CalcParameters) -> Calc {
    let mut calc = Calc::new("TEST", "TEST", parameters);
    calc.execute();
    calc
}

fn run_steps(steps: &[(usize, &str)]) -> Calc {
    let mut parameters = CalcParameters::new();
    with_steps(&mut parameters, steps);
    run(parameters)
}

fn value(calc: &Calc, id: ParamId) -> f64 {
    calc.parameters().value(id).as_f64()
}

fn real(x: f64) -> f64 {
    Real::new(x).get()
}

#[test]
fn add_in_all_three_shapes() {
    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::M01, Value::real(1.0 + 1.0 / 9.0));
    parameters.set(ParamId::M02, Value::real(1.0 + 1.0 / 3.0));
    with_steps(
        &mut parameters,
        &[
            (1, "IN 1"),
            (2, "IN 1"),
            (3, "ADD"),
            (4, "OUT RO01"),
            (5, "IN 1"),
            (6, "IN 1"),
            (7, "IN 1"),
            (9, "ADD 3"),
            (10, "OUT RO02"),
            (11, "IN M01"),
            (12, "ADD M02"),
            (13, "OUT RO03"),
        ],
    );
    let calc = run(parameters);

    assert_eq!(value(&calc, ParamId::RO01), 2.0);
    assert_eq!(value(&calc, ParamId::RO02), 3.0);
    assert_eq!(
        value(&calc, ParamId::RO03),
        real(real(1.0 + 1.0 / 9.0) + real(1.0 + 1.0 / 3.0))
    );
}

#[test]
fn increments_and_decrements() {
    let calc = run_steps(&[
        (1, "IN 10"),
        (2, "DEC"),
        (3, "STM M11"),
        (4, "DEC 3"),
        (5, "STM M12"),
        (6, "STM M13"),
        (7, "DEC M13"),
        (8, "INC"),
        (9, "STM M14"),
        (10, "INC 3"),
        (11, "STM M15"),
        (12, "STM M16"),
        (13, "INC M16"),
    ]);

    assert_eq!(value(&calc, ParamId::M11), 9.0);
    assert_eq!(value(&calc, ParamId::M12), 6.0);
    assert_eq!(value(&calc, ParamId::M13), 5.0);
    assert_eq!(value(&calc, ParamId::M14), 7.0);
    assert_eq!(value(&calc, ParamId::M15), 10.0);
    assert_eq!(value(&calc, ParamId::M16), 11.0);
}

#[test]
fn sign_and_rounding_unaries() {
    let calc = run_steps(&[(1, "IN -5"), (2, "ABS"), (3, "STM M01")]);
    assert_eq!(value(&calc, ParamId::M01), 5.0);

    let calc = run_steps(&[
        (1, "IN -5"),
        (2, "CHS"),
        (3, "STM M01"),
        (4, "IN 5"),
        (5, "CHS"),
        (6, "STM M02"),
    ]);
    assert_eq!(value(&calc, ParamId::M01), 5.0);
    assert_eq!(value(&calc, ParamId::M02), -5.0);

    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::M01, Value::real(1.0 + 1.0 / 9.0));
    with_steps(&mut parameters, &[(1, "IN M01"), (2, "RND"), (3, "STM M02")]);
    let calc = run(parameters);
    assert_eq!(value(&calc, ParamId::M02), 1.0);

    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::M01, Value::real(1.0 + 1.0 / 9.0));
    with_steps(&mut parameters, &[(1, "IN M01"), (2, "TRC"), (3, "STM M02")]);
    let calc = run(parameters);
    assert_eq!(value(&calc, ParamId::M02), 1.0);

    // Truncation is toward zero, also for negatives.
    let calc = run_steps(&[(1, "IN -5"), (2, "IN 2"), (3, "DIV"), (4, "TRC"), (5, "STM M03")]);
    assert_eq!(value(&calc, ParamId::M03), -2.0);
}

#[test]
fn multiplicative_family() {
    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::M01, Value::real(19.713));
    parameters.set(ParamId::M02, Value::real(5.9021));
    with_steps(
        &mut parameters,
        &[
            (1, "IN M01"),
            (2, "IN M02"),
            (3, "IMOD"),
            (4, "OUT RO01"),
            (5, "IN 10"),
            (6, "IN 2"),
            (7, "DIV"),
            (8, "STM M11"),
            (9, "IN 15"),
            (10, "DIV M11"),
            (11, "STM M12"),
            (12, "IN M01"),
            (13, "IN M02"),
            (14, "IDIV M14"),
            (15, "STM M13"),
            (16, "IN 10"),
            (17, "IN 2"),
            (18, "MUL"),
            (19, "STM M15"),
        ],
    );
    let calc = run(parameters);

    assert_eq!(value(&calc, ParamId::RO01), 4.0);
    assert_eq!(value(&calc, ParamId::M11), 5.0);
    assert_eq!(value(&calc, ParamId::M12), 3.0);
    assert_eq!(value(&calc, ParamId::M13), 3.0);
    assert_eq!(value(&calc, ParamId::M14), 4.0);
    assert_eq!(value(&calc, ParamId::M15), 20.0);
}

#[test]
fn divide_by_zero_pushes_zero_and_records() {
    let calc = run_steps(&[(1, "IN 10"), (2, "IN 0"), (3, "DIV"), (4, "OUT RO01")]);

    assert_eq!(value(&calc, ParamId::RO01), 0.0);
    assert_eq!(value(&calc, ParamId::PERROR), 4.0);
    assert_eq!(value(&calc, ParamId::STERR), 3.0);
    assert_eq!(calc.errors(), &[(3, CalcError::Div)]);
    assert!(!calc.syntax_error());
}

#[test]
fn named_divide_reads_the_divisor_from_memory() {
    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::M01, Value::real(5.0));
    with_steps(&mut parameters, &[(1, "IN 10"), (2, "DIV M01"), (3, "STM M11")]);
    let calc = run(parameters);
    assert_eq!(value(&calc, ParamId::M11), 2.0);
}

#[test]
fn exponential_family() {
    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::M01, Value::real(0.693147));
    parameters.set(ParamId::M02, Value::real(1.30103));
    parameters.set(ParamId::M03, Value::real(1.483));
    parameters.set(ParamId::M04, Value::real(3.1));
    with_steps(
        &mut parameters,
        &[
            (1, "IN M01"),
            (2, "ALN"),
            (3, "OUT RO01"),
            (4, "IN M02"),
            (5, "ALOG"),
            (6, "OUT RO02"),
            (7, "IN M03"),
            (8, "EXP M04"),
            (9, "OUT RO03"),
            (10, "IN 1000"),
            (11, "LN"),
            (12, "STM M11"),
            (13, "IN 2000"),
            (14, "LOG"),
            (15, "STM M12"),
        ],
    );
    let calc = run(parameters);

    assert_eq!(value(&calc, ParamId::RO01), 2.0);
    assert_eq!(value(&calc, ParamId::RO02), 19.984375);
    assert_eq!(value(&calc, ParamId::RO03), 3.39453125);
    assert_eq!(value(&calc, ParamId::M11), 6.90625);
    assert_eq!(value(&calc, ParamId::M12), 3.30078125);
}

#[test]
fn square_and_square_root() {
    let calc = run_steps(&[
        (1, "IN 4"),
        (2, "SQR"),
        (3, "STM M01"),
        (4, "SQRT"),
        (5, "STM M02"),
    ]);
    assert_eq!(value(&calc, ParamId::M01), 16.0);
    assert_eq!(value(&calc, ParamId::M02), 4.0);
}

#[test]
fn sqrt_of_negative_records_and_consumes() {
    let calc = run_steps(&[(1, "IN -4"), (2, "SQRT"), (3, "STM M01")]);
    assert_eq!(
        calc.errors(),
        &[(2, CalcError::Sqrt), (3, CalcError::StackUnderflow)]
    );
    // The operand was consumed and nothing pushed, so the store sees an
    // empty stack and writes the underflow default.
    assert_eq!(value(&calc, ParamId::M01), 0.0);
    assert_eq!(value(&calc, ParamId::PERROR), 6.0);
    assert_eq!(value(&calc, ParamId::STERR), 3.0);
}

#[test]
fn log_of_non_positive_leaves_the_accumulator() {
    let calc = run_steps(&[(1, "IN -1"), (2, "LN"), (3, "OUT RO02"), (4, "LOG")]);
    assert_eq!(value(&calc, ParamId::PERROR), 7.0);
    assert_eq!(value(&calc, ParamId::STERR), 4.0);
    assert_eq!(calc.errors(), &[(2, CalcError::Ln), (4, CalcError::Log)]);
    // RO02 write is clamped at the output low scale.
    assert_eq!(value(&calc, ParamId::RO02), 0.0);
    assert_eq!(calc.stack().len(), 1);
}

#[test]
fn statistics_family() {
    let calc = run_steps(&[
        (1, "IN 1"),
        (2, "IN 1"),
        (3, "IN 2"),
        (4, "IN 5"),
        (5, "IN 10"),
        (6, "MEDN"),
        (7, "OUT RO01"),
    ]);
    assert_eq!(value(&calc, ParamId::RO01), 2.0);

    let calc = run_steps(&[
        (1, "IN 1"),
        (2, "IN 1"),
        (3, "IN 2"),
        (4, "IN 5"),
        (5, "IN 10"),
        (6, "MIN"),
        (7, "OUT RO01"),
        (8, "IN 1"),
        (9, "IN 1"),
        (10, "IN 2"),
        (11, "IN 5"),
        (12, "IN 10"),
        (13, "MAX"),
        (14, "OUT RO02"),
    ]);
    assert_eq!(value(&calc, ParamId::RO01), 1.0);
    assert_eq!(value(&calc, ParamId::RO02), 10.0);

    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::M01, Value::real(1.0 + 1.0 / 9.0));
    parameters.set(ParamId::M02, Value::real(1.0 + 1.0 / 3.0));
    with_steps(
        &mut parameters,
        &[
            (1, "IN 4"),
            (2, "IN 2"),
            (3, "AVE"),
            (4, "OUT RO01"),
            (5, "IN 4"),
            (6, "IN 5"),
            (7, "IN 10"),
            (8, "IN 15"),
            (9, "AVE 3"),
            (10, "OUT RO02"),
            (11, "IN M01"),
            (12, "AVE M02"),
            (13, "OUT RO03"),
        ],
    );
    let calc = run(parameters);
    assert_eq!(value(&calc, ParamId::RO01), 3.0);
    assert_eq!(value(&calc, ParamId::RO02), 10.0);
    assert_eq!(
        value(&calc, ParamId::RO03),
        real((real(1.0 + 1.0 / 9.0) + real(1.0 + 1.0 / 3.0)) / 2.0)
    );
}

#[test]
fn trigonometry_family() {
    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::M01, Value::real(0.841471));
    parameters.set(ParamId::M02, Value::real(1.557408));
    parameters.set(ParamId::M03, Value::real(0.5));
    with_steps(
        &mut parameters,
        &[
            (1, "IN 1"),
            (2, "ACOS"),
            (3, "OUT RO01"),
            (4, "IN M01"),
            (5, "ASIN"),
            (6, "OUT RO02"),
            (7, "IN M02"),
            (8, "ATAN"),
            (9, "OUT RO03"),
            (10, "IN M03"),
            (11, "COS"),
            (12, "STM M11"),
            (13, "IN M03"),
            (14, "SIN"),
            (15, "STM M12"),
            (16, "IN M03"),
            (17, "TAN"),
            (18, "STM M13"),
        ],
    );
    let calc = run(parameters);

    assert_eq!(value(&calc, ParamId::RO01), 0.0);
    assert_eq!(value(&calc, ParamId::RO02), 0.99951171875);
    assert_eq!(value(&calc, ParamId::RO03), 1.0);
    assert_eq!(value(&calc, ParamId::M11), 0.87744140625);
    assert_eq!(value(&calc, ParamId::M12), 0.4794921875);
    assert_eq!(value(&calc, ParamId::M13), 0.54638671875);
}

#[rstest]
#[case("ACOS", 3.0)]
#[case("ASIN", 2.0)]
fn arc_domain_errors(#[case] opcode: &str, #[case] code: f64) {
    let mut parameters = CalcParameters::new();
    with_steps(&mut parameters, &[(1, "IN 10"), (3, "OUT RO01")]);
    parameters.set_step(2, opcode);
    let calc = run(parameters);

    assert_eq!(value(&calc, ParamId::PERROR), code);
    assert_eq!(value(&calc, ParamId::STERR), 2.0);
    // The out-of-domain value is pushed back, then clamped on output.
    assert_eq!(value(&calc, ParamId::RO01), 10.0);
}

#[test]
fn rng_progression_is_deterministic() {
    let calc = run_steps(&[(1, "RAND"), (2, "STM M01")]);
    assert_eq!(calc.seed(), 1_223_206);
    assert_eq!(value(&calc, ParamId::M01), 0.4375);
}

#[test]
fn rand_centers_around_one_half() {
    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::M01, Value::real(1000.0));
    parameters.set(ParamId::M02, Value::real(0.5));
    with_steps(
        &mut parameters,
        &[
            (1, "RAND"),
            (2, "SUB M02"),
            (3, "ADD M03"),
            (4, "STM M03"),
            (5, "DEC M01"),
            (6, "IN M01"),
            (7, "BIP 1"),
        ],
    );
    let calc = run(parameters);

    let sum = value(&calc, ParamId::M03);
    assert!(sum != 0.0);
    assert!(sum.abs() < 10.0);
}

#[test]
fn rang_stays_near_zero_in_aggregate() {
    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::M01, Value::real(1000.0));
    with_steps(
        &mut parameters,
        &[
            (1, "RANG"),
            (2, "ADD M03"),
            (3, "STM M03"),
            (4, "DEC M01"),
            (5, "IN M01"),
            (6, "BIP 1"),
        ],
    );
    let calc = run(parameters);

    let sum = value(&calc, ParamId::M03);
    assert!(sum != 0.0);
    assert!(sum.abs() < 100.0);
}

#[test]
fn seed_accepts_the_inclusive_range() {
    let calc = run_steps(&[(1, "IN 100"), (2, "SEED")]);
    assert_eq!(calc.seed(), 100);

    let calc = run_steps(&[(1, "IN 60000"), (2, "SEED")]);
    assert_eq!(calc.seed(), 60_000);

    // Out-of-range values leave the seed alone.
    let calc = run_steps(&[(1, "IN -1"), (2, "SEED")]);
    assert_eq!(calc.seed(), 524_287);

    // Values past the half-precision range saturate on the stack and land
    // outside the accepted window, so the seed survives those too.
    let calc = run_steps(&[(1, "IN 524287"), (2, "SEED")]);
    assert_eq!(calc.seed(), 524_287);
}

#[test]
fn boolean_truth_tables() {
    let calc = run_steps(&[
        (1, "IN 1"),
        (2, "IN 1"),
        (3, "AND"),
        (4, "OUT BO01"),
        (5, "IN 0"),
        (6, "IN 1"),
        (7, "IN 1"),
        (8, "IN 1"),
        (9, "AND 3"),
        (10, "OUT BO02"),
        (11, "IN 0"),
        (12, "IN 1"),
        (13, "IN 1"),
        (14, "AND 3"),
        (15, "OUT BO03"),
        (16, "IN 1"),
        (17, "IN 0"),
        (18, "OR"),
        (19, "OUT BO04"),
        (20, "IN 1"),
        (21, "IN 0"),
        (22, "IN 0"),
        (23, "IN 0"),
        (24, "OR 3"),
        (25, "OUT BO05"),
        (26, "IN 1"),
        (27, "IN 1"),
        (28, "IN 1"),
        (29, "OR 3"),
        (30, "OUT BO06"),
    ]);

    assert_eq!(value(&calc, ParamId::BO01), 1.0);
    assert_eq!(value(&calc, ParamId::BO02), 1.0);
    assert_eq!(value(&calc, ParamId::BO03), 0.0);
    assert_eq!(value(&calc, ParamId::BO04), 1.0);
    assert_eq!(value(&calc, ParamId::BO05), 0.0);
    assert_eq!(value(&calc, ParamId::BO06), 1.0);
}

#[test]
fn negated_and_exclusive_logic() {
    // The counted forms pop exactly their operands, leaving earlier results
    // on the stack undisturbed.
    let calc = run_steps(&[
        (1, "IN 1"),
        (2, "NOT"),
        (3, "OUT BO01"),
        (4, "IN 0"),
        (5, "NOT"),
        (6, "OUT BO02"),
        (7, "IN 1"),
        (8, "IN 0"),
        (9, "XOR 2"),
        (10, "OUT BO03"),
        (11, "IN 1"),
        (12, "IN 1"),
        (13, "XOR 2"),
        (14, "OUT BO04"),
        (15, "IN 1"),
        (16, "IN 0"),
        (17, "NAND 2"),
        (18, "OUT BO05"),
        (19, "IN 0"),
        (20, "IN 0"),
        (21, "NOR 2"),
        (22, "OUT BO06"),
        (23, "IN 1"),
        (24, "IN 1"),
        (25, "NXOR 2"),
        (26, "OUT BO07"),
    ]);

    assert_eq!(value(&calc, ParamId::BO01), 0.0);
    assert_eq!(value(&calc, ParamId::BO02), 1.0);
    assert_eq!(value(&calc, ParamId::BO03), 1.0);
    assert_eq!(value(&calc, ParamId::BO04), 0.0);
    assert_eq!(value(&calc, ParamId::BO05), 1.0);
    assert_eq!(value(&calc, ParamId::BO06), 1.0);
    assert_eq!(value(&calc, ParamId::BO07), 1.0);
}

#[test]
fn flip_flops_hold_and_reset() {
    // Set wins: FF pops reset (0) then set (1).
    let calc = run_steps(&[(1, "IN 1"), (2, "IN 0"), (3, "FF"), (4, "STM M01")]);
    assert_eq!(value(&calc, ParamId::M01), 1.0);

    // Reset wins.
    let calc = run_steps(&[(1, "IN 0"), (2, "IN 1"), (3, "FF"), (4, "STM M01")]);
    assert_eq!(value(&calc, ParamId::M01), 0.0);

    // Both set: FF holds the remaining accumulator, MRS resets.
    let calc = run_steps(&[
        (1, "IN 7"),
        (2, "IN 1"),
        (3, "IN 1"),
        (4, "FF"),
        (5, "STM M01"),
    ]);
    assert_eq!(value(&calc, ParamId::M01), 7.0);

    let calc = run_steps(&[
        (1, "IN 7"),
        (2, "IN 1"),
        (3, "IN 1"),
        (4, "MRS"),
        (5, "STM M01"),
    ]);
    assert_eq!(value(&calc, ParamId::M01), 0.0);
}

#[rstest]
#[case("EXIT")]
#[case("END")]
fn termination_stops_the_cycle(#[case] terminator: &str) {
    let mut parameters = CalcParameters::new();
    with_steps(
        &mut parameters,
        &[(1, "IN 1"), (2, "OUT RO01"), (4, "IN 2"), (5, "OUT RO01")],
    );
    parameters.set_step(3, terminator);
    let calc = run(parameters);
    assert_eq!(value(&calc, ParamId::RO01), 1.0);

    let mut parameters = CalcParameters::new();
    with_steps(
        &mut parameters,
        &[
            (1, "IN 1"),
            (2, "OUT RO01"),
            (3, "BIT 5"),
            (5, "IN 2"),
            (6, "OUT RO01"),
        ],
    );
    parameters.set_step(4, terminator);
    let calc = run(parameters);
    assert_eq!(value(&calc, ParamId::RO01), 2.0);
}

#[rstest]
#[case("IN -1", "BIN 6", 4.0)]
#[case("IN 1", "BIN 6", 2.0)]
#[case("IN -1", "BIP 6", 2.0)]
#[case("IN 1", "BIP 6", 4.0)]
#[case("IN 0", "BIT 6", 2.0)]
#[case("IN 1", "BIT 6", 4.0)]
#[case("IN 1", "BIF 6", 2.0)]
#[case("IN 0", "BIF 6", 4.0)]
#[case("IN 1", "BIZ 6", 2.0)]
#[case("IN 0", "BIZ 6", 4.0)]
#[case("IN 0", "BII 6", 2.0)]
fn conditional_branches(#[case] input: &str, #[case] branch: &str, #[case] expected: f64) {
    let mut parameters = CalcParameters::new();
    parameters.set_step(1, input);
    parameters.set_step(2, branch);
    with_steps(
        &mut parameters,
        &[
            (3, "IN 2"),
            (4, "OUT RO01"),
            (5, "EXIT"),
            (6, "IN 4"),
            (7, "OUT RO01"),
        ],
    );
    let calc = run(parameters);
    assert_eq!(value(&calc, ParamId::RO01), expected);
}

#[test]
fn goto_skips_forward() {
    let calc = run_steps(&[
        (1, "IN 1"),
        (2, "GTO 5"),
        (3, "IN 9"),
        (4, "OUT RO01"),
        (5, "OUT RO02"),
    ]);
    assert_eq!(value(&calc, ParamId::RO01), 0.0);
    assert_eq!(value(&calc, ParamId::RO02), 1.0);
}

#[test]
fn invalid_goto_falls_through_and_sticks() {
    let calc = run_steps(&[(1, "IN 1"), (2, "GTO 51"), (3, "OUT RO01")]);

    // The bad jump falls through within the cycle...
    assert_eq!(value(&calc, ParamId::RO01), 1.0);
    assert_eq!(value(&calc, ParamId::PERROR), -4.0);
    assert_eq!(value(&calc, ParamId::STERR), 2.0);
    // ...but the negative code permanently disables the block.
    assert!(calc.syntax_error());
}

#[test]
fn skip_steps_set_their_flag_and_jump_one() {
    let calc = run_steps(&[
        (1, "IN -1"),
        (2, "SSN M01"),
        (3, "IN 7"),
        (4, "STM M02"),
    ]);
    // Step 3 was skipped: M02 catches the original accumulator.
    assert_eq!(value(&calc, ParamId::M01), 1.0);
    assert_eq!(value(&calc, ParamId::M02), -1.0);

    let calc = run_steps(&[
        (1, "IN 5"),
        (2, "SSN M01"),
        (3, "IN 7"),
        (4, "STM M02"),
    ]);
    assert_eq!(value(&calc, ParamId::M01), 0.0);
    assert_eq!(value(&calc, ParamId::M02), 7.0);

    let calc = run_steps(&[(1, "IN 0"), (2, "SSZ BO01"), (3, "IN 7"), (4, "STM M02")]);
    assert_eq!(value(&calc, ParamId::BO01), 1.0);
    assert_eq!(value(&calc, ParamId::M02), 0.0);
}

#[test]
fn io_paths_and_inversion() {
    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::BI01, Value::boolean(true));
    parameters.set(ParamId::RI01, Value::real(123.456));
    parameters.set(ParamId::HSCI1, Value::real(200.0));
    parameters.set(ParamId::HSCO1, Value::real(200.0));
    parameters.set(ParamId::II01, Value::integer(123.0));
    with_steps(
        &mut parameters,
        &[
            (1, "IN BI01"),
            (2, "OUT BO01"),
            (3, "IN RI01"),
            (4, "OUT RO01"),
            (5, "OUT RO02"),
            (6, "IN II01"),
            (7, "OUT IO01"),
            (10, "IN"),
            (11, "OUT RO02"),
            (12, "IN ~BI01"),
            (13, "OUT BO02"),
            (14, "IN ~RI01"),
            (15, "OUT BO03"),
            (16, "IN 111"),
            (17, "STM M01"),
            (18, "END"),
        ],
    );
    let calc = run(parameters);

    assert_eq!(value(&calc, ParamId::BO01), 1.0);
    // Half precision is visible on the way through the stack.
    assert_eq!(value(&calc, ParamId::RO01), 123.4375);
    assert_eq!(value(&calc, ParamId::IO01), 123.0);
    assert_eq!(value(&calc, ParamId::RO02), 0.0);
    assert_eq!(value(&calc, ParamId::BO02), 0.0);
    assert_eq!(value(&calc, ParamId::BO03), 0.0);
    assert_eq!(value(&calc, ParamId::M01), 111.0);
}

#[test]
fn scaled_reads_clamp_against_their_siblings() {
    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::RI01, Value::real(150.0));
    with_steps(&mut parameters, &[(1, "IN RI01"), (2, "STM M01")]);
    let calc = run(parameters);
    // HSCI1 defaults to 100.
    assert_eq!(value(&calc, ParamId::M01), 100.0);
}

#[test]
fn scaled_writes_clamp_against_their_siblings() {
    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::LSCO1, Value::real(10.0));
    parameters.set(ParamId::HSCO1, Value::real(20.0));
    with_steps(&mut parameters, &[(1, "IN 50"), (2, "OUT RO01"), (3, "IN 5"), (4, "OUT RO02")]);
    let calc = run(parameters);
    assert_eq!(value(&calc, ParamId::RO01), 20.0);
    // RO02 keeps its default scales.
    assert_eq!(value(&calc, ParamId::RO02), 5.0);
}

#[test]
fn memory_stores_and_clear_all() {
    let calc = run_steps(&[(1, "IN 111"), (2, "STM M01"), (3, "STM M24")]);
    assert_eq!(value(&calc, ParamId::M01), 111.0);
    assert_eq!(value(&calc, ParamId::M24), 111.0);

    let calc = run_steps(&[
        (1, "IN 111"),
        (2, "STM M01"),
        (3, "STM M24"),
        (4, "CLA"),
    ]);
    assert_eq!(value(&calc, ParamId::M01), 0.0);
    assert_eq!(value(&calc, ParamId::M24), 0.0);
}

#[test]
fn memory_single_clear_load_and_read_clear() {
    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::M05, Value::real(42.0));
    with_steps(
        &mut parameters,
        &[
            (1, "LAC M05"),
            (2, "STM M06"),
            (3, "RCL M06"),
            (4, "STM M07"),
            (5, "CLM M05"),
        ],
    );
    let calc = run(parameters);

    assert_eq!(value(&calc, ParamId::M05), 0.0);
    // RCL pushed the value then cleared its source.
    assert_eq!(value(&calc, ParamId::M06), 0.0);
    assert_eq!(value(&calc, ParamId::M07), 42.0);
}

#[test]
fn stack_depth_is_observable() {
    let calc = run_steps(&[(1, "IN 111")]);
    assert_eq!(calc.stack().len(), 1);

    let calc = run_steps(&[(1, "IN 111"), (2, "POP")]);
    assert_eq!(calc.stack().len(), 0);

    let calc = run_steps(&[(1, "IN 1"), (2, "IN 2"), (3, "IN 3"), (4, "CST")]);
    assert_eq!(calc.stack().len(), 0);
}

#[test]
fn stack_overflow_drops_the_oldest() {
    let steps: Vec<(usize, String)> = (1..=40).map(|n| (n, format!("IN {n}"))).collect();
    let mut parameters = CalcParameters::new();
    for (number, source) in &steps {
        parameters.set_step(*number, source);
    }
    let calc = run(parameters);

    assert_eq!(calc.stack().len(), 32);
    assert!(calc
        .errors()
        .iter()
        .any(|(_, error)| *error == CalcError::StackOverflow));
    // The oldest pushes were dropped: the bottom of the stack is now 9.
    assert_eq!(calc.stack()[0].value.get(), 9.0);
    assert_eq!(calc.stack()[31].value.get(), 40.0);
}

#[test]
fn underflow_records_and_defaults_to_zero() {
    let calc = run_steps(&[(1, "POP"), (2, "ADD")]);
    assert!(calc
        .errors()
        .iter()
        .all(|(_, error)| *error == CalcError::StackUnderflow));
    assert_eq!(calc.errors().len(), 3);
    assert_eq!(value(&calc, ParamId::PERROR), 6.0);
}

#[test]
fn comments_are_ignored_at_runtime() {
    let calc = run_steps(&[(1, "IN 111; IN 222"), (2, "STM M01 ;comment")]);
    assert_eq!(value(&calc, ParamId::M01), 111.0);
}

#[test]
fn missing_operand_on_in_is_not_an_error() {
    let calc = run_steps(&[(1, "IN"), (2, "END")]);
    assert!(!calc.syntax_error());
    assert!(calc.errors().is_empty());
}

#[test]
fn unknown_opcodes_disable_the_block() {
    let mut parameters = CalcParameters::new();
    with_steps(&mut parameters, &[(1, "TEST"), (2, "IN 1"), (3, "STM M01")]);
    let mut calc = Calc::new("TEST", "TEST", parameters);

    assert!(calc.syntax_error());
    assert_eq!(calc.errors(), &[(1, CalcError::InvalidOpcode)]);
    assert_eq!(value(&calc, ParamId::PERROR), -1.0);
    assert_eq!(value(&calc, ParamId::STERR), 1.0);

    // Execution is observationally a no-op from then on.
    calc.execute();
    calc.execute();
    assert_eq!(calc.stack().len(), 0);
    assert_eq!(calc.errors().len(), 1);
    assert_eq!(value(&calc, ParamId::M01), 0.0);
    assert_eq!(value(&calc, ParamId::PERROR), -1.0);
}

#[test]
fn invalid_operands_disable_the_block() {
    let mut parameters = CalcParameters::new();
    with_steps(&mut parameters, &[(1, "STM RX99")]);
    let calc = Calc::new("TEST", "TEST", parameters);
    assert!(calc.syntax_error());
    assert_eq!(calc.errors(), &[(1, CalcError::InvalidOperand)]);
    assert_eq!(value(&calc, ParamId::PERROR), -2.0);
}

#[test]
fn ma_gates_non_memory_outputs() {
    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::INITMA, Value::short(0.0));
    parameters.set(ParamId::RO01, Value::real(55.0));
    with_steps(
        &mut parameters,
        &[
            (1, "IN 1"),
            (2, "OUT RO01"),
            (3, "OUT BO01"),
            (4, "OUT IO01"),
            (5, "OUT LO01"),
            (6, "STM M01"),
            (7, "INC RO01"),
        ],
    );
    let calc = run(parameters);

    // Non-memory targets are untouched while MA is off.
    assert_eq!(value(&calc, ParamId::RO01), 55.0);
    assert_eq!(value(&calc, ParamId::BO01), 0.0);
    assert_eq!(value(&calc, ParamId::IO01), 0.0);
    assert_eq!(value(&calc, ParamId::LO01), 0.0);
    // Memory writes still land.
    assert_eq!(value(&calc, ParamId::M01), 1.0);
}

#[test]
fn output_width_follows_the_value_class() {
    let calc = run_steps(&[
        (1, "IN 40000"),
        (2, "OUT IO01"),
        (3, "OUT LO01"),
        (4, "IN 3"),
        (5, "IN 2"),
        (6, "DIV"),
        (7, "OUT IO02"),
        (8, "OUT BO01"),
    ]);

    // Integer clamps at its width, long does not need to.
    assert_eq!(value(&calc, ParamId::IO01), 32_767.0);
    assert_eq!(value(&calc, ParamId::LO01), 40_000.0);
    // 1.5 truncates into the integer output but is truthy as a boolean.
    assert_eq!(value(&calc, ParamId::IO02), 1.0);
    assert_eq!(value(&calc, ParamId::BO01), 1.0);
}

#[test]
fn parse_is_deterministic() {
    let steps = [
        (1usize, "IN RI01"),
        (2, "ADD M01"),
        (3, "BADOP"),
        (7, "OUT RO01"),
    ];
    let build = || {
        let mut parameters = CalcParameters::new();
        for (number, source) in &steps {
            parameters.set_step(*number, source);
        }
        Calc::new("TEST", "TEST", parameters)
    };
    let first = build();
    let second = build();

    assert_eq!(first.program(), second.program());
    assert_eq!(first.errors(), second.errors());
}

#[quickcheck]
fn prop_half_precision_is_idempotent(x: f64) -> bool {
    let once = Real::new(x).get();
    let twice = Real::new(once).get();
    twice.to_bits() == once.to_bits()
}

#[quickcheck]
fn prop_stack_never_exceeds_the_cap(extra: u8) -> bool {
    let count = 33 + (extra as usize % 18);
    let mut parameters = CalcParameters::new();
    for number in 1..=count {
        parameters.set_step(number, "IN 1");
    }
    let calc = run(parameters);

    calc.stack().len() <= 32
        && calc
            .errors()
            .iter()
            .any(|(_, error)| *error == CalcError::StackOverflow)
}

#[quickcheck]
fn prop_scaled_outputs_stay_in_range(x: f64) -> bool {
    if x.is_nan() {
        return true;
    }
    let mut parameters = CalcParameters::new();
    parameters.set(ParamId::M01, Value::real(x));
    with_steps(&mut parameters, &[(1, "IN M01"), (2, "OUT RO01")]);
    let calc = run(parameters);

    let out = value(&calc, ParamId::RO01);
    (0.0..=100.0).contains(&out)
}
