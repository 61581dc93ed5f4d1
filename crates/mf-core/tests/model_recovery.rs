//! End-to-end recovery tests on synthetic data with known parameters.

use mf_common::Error;
use mf_core::inference::{
    infer, update_mean, ComponentStats, InferenceSettings, InferenceState, PrecisionExpectation,
};
use mf_core::model::{
    build_gaussian_mean_model, build_gaussian_mean_precision_model, build_mixture_model,
};
use mf_core::synth::{generate, Source};
use mf_math::Gaussian;

fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol * a.abs().max(b.abs()).max(1.0)
}

#[test]
fn recovers_mean_and_precision() {
    let source = Source::new(1.0, 5.0, 2.0).unwrap();
    let (data, _) = generate(&[source], 1000, 42).unwrap();
    let (spec, h) = build_gaussian_mean_precision_model(0.0, 1.0, 2.0, 1.0, &data).unwrap();

    let report = infer(&spec, InferenceSettings::default()).unwrap();
    assert_eq!(report.status, InferenceState::Converged);
    assert_eq!(report.elbo_decreases, 0);

    let mean = report.posteriors.gaussian(h.mean).unwrap();
    let precision = report.posteriors.gamma(h.precision).unwrap();
    assert!((mean.mean - 5.0).abs() < 0.1, "mean {}", mean.mean);
    assert!((precision.mean - 2.0).abs() < 0.3, "precision {}", precision.mean);
}

#[test]
fn single_component_mixture_matches_mean_precision_model() {
    let source = Source::new(1.0, -3.0, 0.5).unwrap();
    let (data, _) = generate(&[source], 200, 7).unwrap();

    let (plain, ph) = build_gaussian_mean_precision_model(0.0, 1.0, 2.0, 1.0, &data).unwrap();
    let (mixture, mh) = build_mixture_model(1, 0.0, 1.0, 2.0, 1.0, &[1.1], &data).unwrap();

    let a = infer(&plain, InferenceSettings::default()).unwrap();
    let b = infer(&mixture, InferenceSettings::default()).unwrap();
    assert_eq!(a.status, b.status);
    assert!(close(a.elbo, b.elbo, 1e-9), "{} vs {}", a.elbo, b.elbo);

    let (ma, mb) = (
        a.posteriors.gaussian(ph.mean).unwrap(),
        b.posteriors.gaussian(mh.means[0]).unwrap(),
    );
    assert!(close(ma.mean, mb.mean, 1e-9));
    assert!(close(ma.precision, mb.precision, 1e-9));

    let (ta, tb) = (
        a.posteriors.gamma(ph.precision).unwrap(),
        b.posteriors.gamma(mh.precisions[0]).unwrap(),
    );
    assert!(close(ta.shape, tb.shape, 1e-9));
    assert!(close(ta.rate, tb.rate, 1e-9));

    for id in &mh.assignments {
        assert_eq!(b.posteriors.categorical(*id).unwrap().probabilities, vec![1.0]);
    }
}

#[test]
fn separates_three_clusters() {
    let sources = [
        Source::new(1.0, -10.0, 4.0).unwrap(),
        Source::new(1.0, 0.0, 4.0).unwrap(),
        Source::new(1.0, 10.0, 4.0).unwrap(),
    ];
    let (data, labels) = generate(&sources, 150, 11).unwrap();
    let (spec, h) = build_mixture_model(3, 0.0, 0.01, 2.0, 1.0, &[1.0], &data).unwrap();

    let settings = InferenceSettings {
        restarts: 5,
        ..InferenceSettings::default()
    };
    let report = infer(&spec, settings).unwrap();
    assert_eq!(report.restarts, 5);
    assert_eq!(report.elbo_decreases, 0);

    // Components are exchangeable: map each true source to the component
    // that claims its first point, then require every point to agree.
    let mut component_of = [usize::MAX; 3];
    for (id, &label) in h.assignments.iter().zip(labels.iter()) {
        let probs = report.posteriors.categorical(*id).unwrap();
        let best = probs.argmax();
        if component_of[label] == usize::MAX {
            component_of[label] = best;
        }
        assert_eq!(best, component_of[label], "source {} split across components", label);
        assert!(
            probs.probabilities[best] > 0.9,
            "point of source {} has p = {:?}",
            label,
            probs.probabilities
        );
    }
    let mut used = component_of.to_vec();
    used.sort_unstable();
    used.dedup();
    assert_eq!(used.len(), 3, "sources share a component: {:?}", component_of);

    for (label, &component) in component_of.iter().enumerate() {
        let mean = report.posteriors.gaussian(h.means[component]).unwrap().mean;
        assert!((mean - sources[label].mean).abs() < 0.5, "component mean {}", mean);
    }
}

#[test]
fn sequential_update_equals_batch() {
    let batch_a = [1.2, 0.7, 2.5, 1.9];
    let batch_b = [0.3, 1.1, 1.6];
    let all: Vec<f64> = batch_a.iter().chain(batch_b.iter()).copied().collect();

    let (spec_a, ha) = build_gaussian_mean_model(0.0, 0.5, 2.0, &batch_a).unwrap();
    let first = infer(&spec_a, InferenceSettings::default()).unwrap();
    let prior = first.posteriors.gaussian(ha.mean).unwrap().to_prior().unwrap();

    let (spec_b, hb) =
        build_gaussian_mean_model(prior.mean, prior.precision, 2.0, &batch_b).unwrap();
    let sequential = infer(&spec_b, InferenceSettings::default()).unwrap();

    let (spec_all, hall) = build_gaussian_mean_model(0.0, 0.5, 2.0, &all).unwrap();
    let batch = infer(&spec_all, InferenceSettings::default()).unwrap();

    let s = sequential.posteriors.gaussian(hb.mean).unwrap();
    let b = batch.posteriors.gaussian(hall.mean).unwrap();
    assert!(close(s.mean, b.mean, 1e-12), "{} vs {}", s.mean, b.mean);
    assert!(close(s.precision, b.precision, 1e-12));
}

#[test]
fn summary_as_prior_without_data_is_unchanged() {
    let (spec, h) = build_gaussian_mean_model(0.0, 1.0, 1.0, &[2.0, 4.0]).unwrap();
    let report = infer(&spec, InferenceSettings::default()).unwrap();
    let summary = report.posteriors.gaussian(h.mean).unwrap();
    let prior = summary.to_prior().unwrap();

    let updated = update_mean(&prior, PrecisionExpectation::fixed(1.0), &ComponentStats::empty())
        .unwrap();
    assert_eq!(updated, prior);
    assert_eq!(updated, Gaussian::new(summary.mean, summary.precision).unwrap());
}

#[test]
fn empty_data_is_config_error() {
    let err = build_gaussian_mean_model(0.0, 1.0, 1.0, &[]).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{:?}", err);
    let err = build_gaussian_mean_precision_model(0.0, 1.0, 2.0, 1.0, &[]).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{:?}", err);
    let err = build_mixture_model(2, 0.0, 1.0, 2.0, 1.0, &[1.0], &[]).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{:?}", err);
}

#[test]
fn zero_components_is_config_error() {
    let err = build_mixture_model(0, 0.0, 1.0, 2.0, 1.0, &[1.0], &[1.0, 2.0]).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{:?}", err);
}

#[test]
fn iteration_cap_still_reports_posteriors() {
    let (data, _) = generate(&[Source::new(1.0, 1.0, 1.0).unwrap()], 50, 3).unwrap();
    let (spec, h) = build_gaussian_mean_precision_model(0.0, 1.0, 2.0, 1.0, &data).unwrap();
    let settings = InferenceSettings {
        max_iterations: 1,
        ..InferenceSettings::default()
    };
    let report = infer(&spec, settings).unwrap();
    assert_eq!(report.status, InferenceState::MaxIterExceeded);
    assert_eq!(report.iterations, 1);
    assert!(report.posteriors.gamma(h.precision).unwrap().mean.is_finite());
}
