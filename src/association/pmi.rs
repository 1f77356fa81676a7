/// Pointwise mutual information with add-one smoothing.
///
/// `ln( P(x1..xk) / Π P(xi) )` where every probability is estimated as
/// `(count + 1) / (total + vocabulary)`. Unseen events therefore never
/// divide by zero. For `k = 2` the result is symmetric in its marginals.
pub fn smoothed_pmi(joint: u64, marginals: &[u64], total: u64, vocabulary: u64) -> f64 {
    let space = (total + vocabulary) as f64;
    if space <= 0.0 || marginals.is_empty() {
        return 0.0;
    }

    let k = marginals.len() as f64;
    let joint_term = ((joint + 1) as f64).ln();
    let marginal_terms: f64 = marginals.iter().map(|c| ((*c + 1) as f64).ln()).sum();

    joint_term + (k - 1.0) * space.ln() - marginal_terms
}
