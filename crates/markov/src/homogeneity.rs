//! Tests of whether several transition matrices share one structure.
//!
//! [`homogeneity`] compares regime-specific count matrices against their
//! pooled counterpart with a likelihood ratio (`LR`) and a Pearson-type
//! (`Q`) statistic. [`chi2`] compares one count matrix against the row
//! probabilities of another, and [`kullback`] tests conditional homogeneity
//! of a stratified set of count matrices.

use std::fmt;

use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};

use geodyn_stats::chi2_sf;

use crate::error::MarkovError;

/// A chi-square statistic with its degrees of freedom and p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChiSquareTest {
    /// Test statistic.
    pub statistic: f64,
    /// Upper-tail probability of the statistic.
    pub p_value: f64,
    /// Degrees of freedom.
    pub dof: usize,
}

impl ChiSquareTest {
    fn new(statistic: f64, dof: usize) -> Self {
        Self {
            statistic,
            p_value: chi2_sf(statistic, dof),
            dof,
        }
    }
}

fn row_normalize(counts: &ArrayView2<'_, f64>) -> Array2<f64> {
    let mut p = counts.to_owned();
    for mut row in p.axis_iter_mut(Axis(0)) {
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|c| c / sum);
        }
    }
    p
}

fn check_square(rows: usize, cols: usize) -> Result<(), MarkovError> {
    if rows != cols {
        return Err(MarkovError::NotSquare { rows, cols });
    }
    if rows == 0 {
        return Err(MarkovError::EmptyData);
    }
    Ok(())
}

/// Chi-square test of `t1` against the row probabilities of `t2`.
///
/// Expected counts distribute the row totals of `t1` over the row
/// probabilities of `t2`. Cells with zero expectation contribute their
/// squared observed count. The degrees of freedom count only rows with
/// transitions: `(nonzero rows of t1 - 1)(nonzero rows of t2 - 1)`.
///
/// # Errors
///
/// Returns [`MarkovError`] if the matrices are not square or differ in
/// shape.
pub fn chi2(t1: ArrayView2<'_, f64>, t2: ArrayView2<'_, f64>) -> Result<ChiSquareTest, MarkovError> {
    let (rows, cols) = t1.dim();
    check_square(rows, cols)?;
    if t2.dim() != t1.dim() {
        return Err(MarkovError::ShapeMismatch {
            field: "reference matrix rows",
            expected: rows,
            got: t2.nrows(),
        });
    }
    let rs1 = t1.sum_axis(Axis(1));
    let rs2 = t2.sum_axis(Axis(1));
    let nz1 = rs1.iter().filter(|&&s| s > 0.0).count();
    let nz2 = rs2.iter().filter(|&&s| s > 0.0).count();
    let dof = nz1.saturating_sub(1) * nz2.saturating_sub(1);

    let mut statistic = 0.0;
    for i in 0..rows {
        let denom = if rs2[i] == 0.0 { 1.0 } else { rs2[i] };
        for j in 0..cols {
            let expected = rs1[i] * t2[[i, j]] / denom;
            let diff = t1[[i, j]] - expected;
            let scale = if expected == 0.0 { 1.0 } else { expected };
            statistic += diff * diff / scale;
        }
    }
    Ok(ChiSquareTest::new(statistic, dof))
}

/// Outcome of the Kullback conditional homogeneity test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KullbackTest {
    /// Conditional homogeneity statistic.
    pub statistic: f64,
    /// Degrees of freedom, `r (s - 1) (r - 1)`.
    pub dof: usize,
    /// Upper-tail probability.
    pub p_value: f64,
}

fn xlogx(x: f64) -> f64 {
    if x > 0.0 { x * x.ln() } else { 0.0 }
}

/// Kullback conditional homogeneity test.
///
/// `f` is `s x r x r`: one transition count matrix per stratum.
///
/// # Errors
///
/// Returns [`MarkovError`] if the strata are not square or `f` is empty.
pub fn kullback(f: ArrayView3<'_, f64>) -> Result<KullbackTest, MarkovError> {
    let (s, r, c) = f.dim();
    check_square(r, c)?;
    if s == 0 {
        return Err(MarkovError::EmptyData);
    }
    let pooled = f.sum_axis(Axis(0));
    let cells: f64 = f.iter().map(|&x| xlogx(x)).sum();
    let pooled_cells: f64 = pooled.iter().map(|&x| xlogx(x)).sum();
    let pooled_rows: f64 = pooled.sum_axis(Axis(1)).iter().map(|&x| xlogx(x)).sum();
    let stratum_rows: f64 = f.sum_axis(Axis(2)).iter().map(|&x| xlogx(x)).sum();

    let statistic = 2.0 * (cells - stratum_rows - pooled_cells + pooled_rows);
    let dof = r * (s - 1) * (r - 1);
    Ok(KullbackTest {
        statistic,
        dof,
        p_value: chi2_sf(statistic, dof),
    })
}

/// Pseudo p-value of `observed` against permutation realizations:
/// `(1 + #{realization >= observed}) / (1 + realizations)`.
pub fn permutation_p_value(observed: f64, realizations: &[f64]) -> f64 {
    let larger = realizations.iter().filter(|&&x| x >= observed).count();
    (larger + 1) as f64 / (realizations.len() + 1) as f64
}

/// Results of the homogeneity test over `m` regimes of `k` classes.
#[derive(Debug, Clone)]
pub struct HomogeneityResults {
    /// Pearson-type statistic.
    pub q: f64,
    /// Likelihood ratio statistic.
    pub lr: f64,
    /// Degrees of freedom shared by both statistics.
    pub dof: usize,
    /// p-value of `q`.
    pub q_p_value: f64,
    /// p-value of `lr`.
    pub lr_p_value: f64,
    /// Pooled transition probabilities (the null model).
    pub p_h0: Array2<f64>,
    /// Regime transition probabilities, `m x k x k`.
    pub p_h1: Array3<f64>,
    /// Per-cell contributions to `q`.
    pub q_table: Array3<f64>,
    /// Per-cell contributions to `lr`.
    pub lr_table: Array3<f64>,
    /// Nonzero pooled cells per row.
    pub a_i: Array1<usize>,
    /// Nonzero cells per row and regime, `k x m`.
    pub a_im: Array2<usize>,
    /// Whether a regime has transitions from a row, `k x m`.
    pub b: Array2<usize>,
    /// Regimes with transitions from each row.
    pub b_i: Array1<usize>,
    /// Total number of transitions.
    pub t_total: f64,
    /// Regime labels, defaulting to `0..m`.
    pub regime_names: Vec<String>,
    /// Class labels, defaulting to `0..k`.
    pub class_names: Vec<String>,
    /// Title used by the text summary.
    pub title: String,
}

impl HomogeneityResults {
    /// Number of regimes.
    pub fn m(&self) -> usize {
        self.p_h1.len_of(Axis(0))
    }

    /// Number of classes.
    pub fn k(&self) -> usize {
        self.p_h0.nrows()
    }

    /// Replaces the summary title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// The LR statistic as a [`ChiSquareTest`].
    pub fn lr_test(&self) -> ChiSquareTest {
        ChiSquareTest {
            statistic: self.lr,
            p_value: self.lr_p_value,
            dof: self.dof,
        }
    }

    /// The Q statistic as a [`ChiSquareTest`].
    pub fn q_test(&self) -> ChiSquareTest {
        ChiSquareTest {
            statistic: self.q,
            p_value: self.q_p_value,
            dof: self.dof,
        }
    }
}

impl fmt::Display for HomogeneityResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The rule is sized by the `P(regime)` headers; tables also fit class names.
        let regime_width = self
            .regime_names
            .iter()
            .map(|r| r.len() + 3)
            .max()
            .unwrap_or(0)
            .max(5);
        let width = self
            .class_names
            .iter()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(regime_width);
        let rule = "-".repeat(self.k() * 4 + (self.k() + 1) * regime_width);

        writeln!(f, "{rule}")?;
        writeln!(f, "{:^w$}", self.title, w = rule.len())?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Number of classes: {}", self.k())?;
        writeln!(f, "Number of transitions: {}", self.t_total as u64)?;
        writeln!(f, "Number of regimes: {}", self.m())?;
        writeln!(f, "Regime names: {}", self.regime_names.join(", "))?;
        writeln!(f, "{rule}")?;
        writeln!(f, "{:>7} {:>20} {:>20}", "Test", "LR", "Chi-2")?;
        writeln!(f, "{:>7} {:>20.3} {:>20.3}", "Stat.", self.lr, self.q)?;
        writeln!(f, "{:>7} {:>20} {:>20}", "DOF", self.dof, self.dof)?;
        writeln!(
            f,
            "{:>7} {:>20.3} {:>20.3}",
            "p-value", self.lr_p_value, self.q_p_value
        )?;
        writeln!(f, "{rule}")?;

        let mut table = |name: &str, p: ArrayView2<'_, f64>| -> fmt::Result {
            write!(f, "{name:<width$}")?;
            for c in &self.class_names {
                write!(f, "    {c:>width$}")?;
            }
            writeln!(f)?;
            for (c, row) in self.class_names.iter().zip(p.rows()) {
                write!(f, "{c:>width$}")?;
                for v in row {
                    write!(f, "    {v:>width$.3}")?;
                }
                writeln!(f)?;
            }
            writeln!(f, "{rule}")
        };
        table("P(H0)", self.p_h0.view())?;
        for (name, p) in self.regime_names.iter().zip(self.p_h1.outer_iter()) {
            table(&format!("P({name})"), p)?;
        }
        Ok(())
    }
}

/// Homogeneity test of `m` regime count matrices (`m x k x k`).
///
/// For row `i`, `b_i` counts regimes with transitions out of `i` and `A_i`
/// counts nonzero pooled cells; the degrees of freedom are
/// `sum_i (b_i - 1)(A_i - 1)`.
///
/// Empty name slices fall back to `0..m` and `0..k`.
///
/// # Errors
///
/// Returns [`MarkovError`] if the matrices are not square, there are no
/// regimes, or a name list has the wrong length.
pub fn homogeneity(
    transitions: ArrayView3<'_, f64>,
    regime_names: &[String],
    class_names: &[String],
) -> Result<HomogeneityResults, MarkovError> {
    let (m, k, c) = transitions.dim();
    check_square(k, c)?;
    if m == 0 {
        return Err(MarkovError::EmptyData);
    }
    let regime_names = names_or_default(regime_names, m, "regime names")?;
    let class_names = names_or_default(class_names, k, "class names")?;

    let pooled = transitions.sum_axis(Axis(0));
    let p_h0 = row_normalize(&pooled.view());
    let a_i: Array1<usize> = pooled
        .rows()
        .into_iter()
        .map(|r| r.iter().filter(|&&x| x > 0.0).count())
        .collect();

    let mut p_h1 = Array3::zeros((m, k, k));
    let mut q_table = Array3::zeros((m, k, k));
    let mut lr_table = Array3::zeros((m, k, k));
    let mut a_im = Array2::<usize>::zeros((k, m));
    let mut b = Array2::<usize>::zeros((k, m));

    for (regime, counts) in transitions.outer_iter().enumerate() {
        let p = row_normalize(&counts);
        let totals = counts.sum_axis(Axis(1));
        for i in 0..k {
            if totals[i] > 0.0 {
                b[[i, regime]] = 1;
            }
            for j in 0..k {
                let p0 = p_h0[[i, j]];
                let den = if p0 == 0.0 { 1.0 } else { p0 };
                let d = p[[i, j]] - p0;
                q_table[[regime, i, j]] = totals[i] * d * d / den;
                let n = counts[[i, j]];
                if n > 0.0 {
                    a_im[[i, regime]] += 1;
                    if p0 > 0.0 {
                        lr_table[[regime, i, j]] = 2.0 * n * (p[[i, j]] / p0).ln();
                    }
                }
            }
        }
        p_h1.index_axis_mut(Axis(0), regime).assign(&p);
    }

    let b_i = b.sum_axis(Axis(1));
    // A row unseen in every regime has b_i = A_i = 0 and contributes one.
    let dof: i64 = b_i
        .iter()
        .zip(a_i.iter())
        .map(|(&bi, &ai)| (bi as i64 - 1) * (ai as i64 - 1))
        .sum();
    let dof = usize::try_from(dof).unwrap_or(0);
    let q = q_table.sum();
    let lr = lr_table.sum();

    Ok(HomogeneityResults {
        q,
        lr,
        dof,
        q_p_value: chi2_sf(q, dof),
        lr_p_value: chi2_sf(lr, dof),
        p_h0,
        p_h1,
        q_table,
        lr_table,
        a_i,
        a_im,
        b,
        b_i,
        t_total: pooled.sum(),
        regime_names,
        class_names,
        title: "Markov Homogeneity Test".to_string(),
    })
}

fn names_or_default(
    names: &[String],
    n: usize,
    field: &'static str,
) -> Result<Vec<String>, MarkovError> {
    if names.is_empty() {
        return Ok((0..n).map(|i| i.to_string()).collect());
    }
    if names.len() != n {
        return Err(MarkovError::ShapeMismatch {
            field,
            expected: n,
            got: names.len(),
        });
    }
    Ok(names.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, stack};

    fn strata() -> Array3<f64> {
        let s1 = array![
            [22., 11., 24., 2., 2., 7.],
            [5., 23., 15., 3., 42., 6.],
            [4., 21., 190., 25., 20., 34.],
            [0., 2., 14., 56., 14., 28.],
            [32., 15., 20., 10., 56., 14.],
            [5., 22., 31., 18., 13., 134.]
        ];
        let s2 = array![
            [3., 6., 9., 3., 0., 8.],
            [1., 9., 3., 12., 27., 5.],
            [2., 9., 208., 32., 5., 18.],
            [0., 14., 32., 108., 40., 40.],
            [22., 14., 9., 26., 224., 14.],
            [1., 5., 13., 53., 13., 116.]
        ];
        stack(Axis(0), &[s1.view(), s2.view()]).unwrap()
    }

    #[test]
    fn kullback_conditional_homogeneity() {
        let test = kullback(strata().view()).unwrap();
        assert_abs_diff_eq!(test.statistic, 160.961, epsilon = 1e-3);
        assert_eq!(test.dof, 30);
        assert!(test.p_value < 1e-12);
    }

    #[test]
    fn homogeneity_statistics() {
        let results = homogeneity(strata().view(), &[], &[]).unwrap();
        assert_abs_diff_eq!(results.lr, 160.9606003, epsilon = 1e-6);
        assert_abs_diff_eq!(results.q, 158.4059328, epsilon = 1e-6);
        // Row 3 has an empty pooled cell.
        assert_eq!(results.a_i.to_vec(), vec![6, 6, 6, 5, 6, 6]);
        assert_eq!(results.b_i.to_vec(), vec![2; 6]);
        assert_eq!(results.dof, 29);
        assert_eq!(results.t_total, 2044.0);
        assert_eq!(results.regime_names, vec!["0", "1"]);
        assert_abs_diff_eq!(
            results.lr_p_value,
            chi2_sf(results.lr, 29),
            epsilon = 1e-15
        );
    }

    #[test]
    fn identical_regimes_are_homogeneous() {
        let t = array![[4.0, 1.0], [2.0, 3.0]];
        let stacked = stack(Axis(0), &[t.view(), t.view()]).unwrap();
        let results = homogeneity(stacked.view(), &[], &[]).unwrap();
        assert_abs_diff_eq!(results.q, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(results.lr, 0.0, epsilon = 1e-12);
        assert_eq!(results.dof, 2);
        assert_abs_diff_eq!(results.q_p_value, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn row_unseen_in_every_regime_adds_one_dof() {
        let t1 = array![[5.0, 5.0, 0.0], [5.0, 5.0, 0.0], [0.0, 0.0, 0.0]];
        let t2 = array![[6.0, 4.0, 0.0], [3.0, 7.0, 0.0], [0.0, 0.0, 0.0]];
        let stacked = stack(Axis(0), &[t1.view(), t2.view()]).unwrap();
        let results = homogeneity(stacked.view(), &[], &[]).unwrap();
        assert_eq!(results.b_i.to_vec(), vec![2, 2, 0]);
        assert_eq!(results.a_i.to_vec(), vec![2, 2, 0]);
        // (2-1)(2-1) twice, plus (0-1)(0-1) for the empty row.
        assert_eq!(results.dof, 3);
        assert_abs_diff_eq!(
            results.q_p_value,
            chi2_sf(results.q, 3),
            epsilon = 1e-15
        );
        assert!(results.to_string().contains(&format!("{:>7} {:>20} {:>20}", "DOF", 3, 3)));
    }

    #[test]
    fn homogeneity_rejects_bad_names() {
        let t = array![[1.0, 0.0], [0.0, 1.0]];
        let stacked = stack(Axis(0), &[t.view()]).unwrap();
        assert!(matches!(
            homogeneity(stacked.view(), &["a".into(), "b".into()], &[]),
            Err(MarkovError::ShapeMismatch { expected: 1, got: 2, .. })
        ));
    }

    #[test]
    fn summary_lists_tables() {
        let results = homogeneity(strata().view(), &["low".into(), "high".into()], &[])
            .unwrap()
            .with_title("Spatial Markov Test");
        let text = results.to_string();
        assert!(text.contains("Spatial Markov Test"));
        assert!(text.contains("Number of regimes: 2"));
        assert!(text.contains("Regime names: low, high"));
        assert!(text.contains("P(H0)"));
        assert!(text.contains("P(high)"));
        // k * 4 + (k + 1) * max(5, len("P(high)")).
        let rule = text.lines().next().unwrap();
        assert_eq!(rule.len(), 6 * 4 + 7 * 7);
    }

    #[test]
    fn summary_tables_widen_for_long_class_names() {
        let t = array![[4.0, 1.0], [2.0, 3.0]];
        let stacked = stack(Axis(0), &[t.view(), t.view()]).unwrap();
        let classes = vec!["lowest".to_string(), "highest".to_string()];
        let text = homogeneity(stacked.view(), &[], &classes)
            .unwrap()
            .to_string();
        // The rule follows the regime headers: 2 * 4 + 3 * 5.
        assert_eq!(text.lines().next().unwrap().len(), 2 * 4 + 3 * 5);
        assert!(text.contains(&format!("{:<7}    {:>7}    {:>7}", "P(H0)", "lowest", "highest")));
    }

    #[test]
    fn pairwise_chi2() {
        let t1 = array![
            [562., 22., 1., 0.],
            [12., 201., 22., 0.],
            [0., 17., 97., 4.],
            [0., 0., 3., 19.]
        ];
        let t2 = array![
            [884., 77., 4., 0.],
            [68., 794., 87., 3.],
            [1., 92., 815., 51.],
            [1., 0., 60., 903.]
        ];
        let test = chi2(t1.view(), t2.view()).unwrap();
        assert_abs_diff_eq!(test.statistic, 23.397284414, epsilon = 1e-6);
        assert_eq!(test.dof, 9);
        assert_abs_diff_eq!(test.p_value, 0.005363116704861337, epsilon = 1e-6);
    }

    #[test]
    fn chi2_dof_ignores_empty_rows() {
        let t1 = array![[1.0, 1.0, 0.0], [1.0, 1.0, 0.0], [0.0, 0.0, 0.0]];
        let t2 = array![[2.0, 1.0, 0.0], [1.0, 2.0, 0.0], [0.0, 0.0, 5.0]];
        assert_eq!(chi2(t1.view(), t2.view()).unwrap().dof, 2);
    }

    #[test]
    fn permutation_p_value_bounds() {
        let realizations = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(permutation_p_value(10.0, &realizations), 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(permutation_p_value(0.0, &realizations), 1.0, epsilon = 1e-12);
        let mut last = 1.0;
        for observed in [0.5, 1.5, 2.5, 3.5, 4.5] {
            let p = permutation_p_value(observed, &realizations);
            assert!(p > 0.0 && p <= last);
            last = p;
        }
    }
}
