use std::{fmt::Write, fs, path::PathBuf};

use clap::{Parser, ValueEnum};
use helm::{
    Assembler, ExtinctionCalculator, ExtinctionCoefficients, ExtinctionUnit, Helm2Notation, canonicalize,
    parse_upgrading,
};
use helm_chem::{FormulaEngine, Massive, MonomerDatabase};
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, IntoDiagnostic, Result};
use rust_decimal::Decimal;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

/// Reads HELM (or HELM1) documents and prints their canonical form, extinction coefficient, formula, and masses
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// A KDL monomer library to use instead of the bundled one
    #[arg(short, long)]
    monomers: Option<PathBuf>,
    /// The units extinction coefficients are reported in
    #[arg(short, long, value_enum, default_value_t = Unit::MilliMolar)]
    unit: Unit,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum Unit {
    #[value(name = "mM")]
    MilliMolar,
    #[value(name = "M")]
    Molar,
}

impl From<Unit> for ExtinctionUnit {
    fn from(unit: Unit) -> Self {
        match unit {
            Unit::MilliMolar => Self::MilliMolar,
            Unit::Molar => Self::Molar,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let db = match &args.monomers {
        Some(path) => {
            let kdl = fs::read_to_string(path).into_diagnostic()?;
            MonomerDatabase::from_kdl(path.display().to_string(), kdl)?
        }
        None => MonomerDatabase::default(),
    };
    let coefficients = ExtinctionCoefficients::default();

    let assembler = Assembler::new(&db, &FormulaEngine);
    let calculator = ExtinctionCalculator::new(&coefficients, &db).with_unit(args.unit.into());

    let mut rl = DefaultEditor::new().into_diagnostic()?;
    while let Ok(line) = rl.readline("HELM: ") {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rl.add_history_entry(line).into_diagnostic()?;
        match parse_upgrading(line) {
            Ok(doc) => print!("{}", describe(&doc, &assembler, &calculator, args.unit)),
            Err(error) => print!("{}", render_error(error)),
        }
    }

    Ok(())
}

fn describe(
    doc: &Helm2Notation,
    assembler: &Assembler<'_, '_, MonomerDatabase, FormulaEngine>,
    calculator: &ExtinctionCalculator<'_, '_, MonomerDatabase>,
    unit: Unit,
) -> String {
    let mut buf = String::new();

    match canonicalize(doc) {
        Ok(canonical) => writeln!(buf, "Canonical: {canonical}").unwrap(),
        Err(error) => buf.push_str(&render_error(error)),
    }

    let units = match unit {
        Unit::MilliMolar => "mM⁻¹cm⁻¹",
        Unit::Molar => "M⁻¹cm⁻¹",
    };
    match calculator.calculate(doc) {
        Ok(extinction) => writeln!(buf, "Extinction Coefficient: {extinction:.2} {units}").unwrap(),
        Err(error) => buf.push_str(&render_error(error)),
    }

    match assembler.formula(doc) {
        Ok(formula) => {
            let mono_mass = formula.monoisotopic_mass().0;
            let avg_mass = formula.average_mass().0;
            writeln!(buf, "Formula: {formula}").unwrap();
            writeln!(buf, "Monoisotopic Mass: {}", decimal_round_workaround(mono_mass, 6)).unwrap();
            writeln!(buf, "Average Mass: {}", decimal_round_workaround(avg_mass, 4)).unwrap();
        }
        Err(error) => buf.push_str(&render_error(error)),
    }

    writeln!(buf).unwrap();
    buf
}

fn render_error(diagnostic: impl Diagnostic) -> String {
    let mut buf = String::new();
    GraphicalReportHandler::new_themed(GraphicalTheme::unicode())
        .render_report(&mut buf, &diagnostic)
        .unwrap();
    buf
}

// FIXME: Really this should be fixed in `rust_decimal`...
fn decimal_round_workaround(value: Decimal, decimal_points: u32) -> String {
    let value = value.round_dp(decimal_points);
    format!("{value}")
}
