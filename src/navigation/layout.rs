//! Equation templates of each [IonosphereMode]
use log::warn;

use crate::{
    carrier::Carrier,
    cfg::{Config, IonosphereMode},
    constants::{
        VAR_BIAS_M2, VAR_CLK_M2, VAR_IFB_M2, VAR_IONO_M2, VAR_ISB_M2, VAR_POS_M2, VAR_TROPO_M2,
    },
    navigation::{
        equation::{Coefficient, EquationTemplate, VariableTemplate},
        stochastic::ProcessModel,
        variable::Parameter,
    },
    observation::Observable,
};

/// Builds the equation templates of this [Config]
pub fn equation_templates(cfg: &Config) -> Vec<EquationTemplate> {
    let opts = &cfg.solver;
    let mut templates = Vec::new();

    let position_model = if cfg.profile.is_static() {
        ProcessModel::constant()
    } else {
        ProcessModel::white_noise(opts.kinematic_sigma_m)
    };

    let position = [
        (Parameter::Dx, Coefficient::LosX),
        (Parameter::Dy, Coefficient::LosY),
        (Parameter::Dz, Coefficient::LosZ),
    ]
    .map(|(parameter, coef)| {
        (
            VariableTemplate::new(parameter, VAR_POS_M2, position_model),
            coef,
        )
    });

    let tropo = VariableTemplate::new(
        Parameter::WetTropo,
        VAR_TROPO_M2,
        ProcessModel::random_walk(opts.tropo_qprime, opts.default_interval_s),
    );

    let ambiguity = |observable: Observable| {
        VariableTemplate::new(
            Parameter::Ambiguity(observable),
            VAR_BIAS_M2,
            ProcessModel::phase_ambiguity(opts.ambiguity_sigma_m),
        )
        .arc_indexed()
    };

    // system of the single receiver clock, in inter system bias mode
    let reference = cfg
        .constellations
        .iter()
        .find(|c| Carrier::dual_frequency(**c).is_some())
        .copied();

    for constellation in cfg.constellations.iter() {
        let dual = match Carrier::dual_frequency(*constellation) {
            Some(dual) => dual,
            None => {
                warn!("{} - constellation not supported", constellation);
                continue;
            },
        };

        let sigma = cfg.sigma(*constellation);
        let (code_weight, phase_weight) = (sigma.code_weight(), sigma.phase_weight());

        let (clock_system, isb) = match reference {
            Some(reference) if opts.inter_system_bias && reference != *constellation => (
                reference,
                Some(VariableTemplate::new(
                    Parameter::InterSystemBias(*constellation),
                    VAR_ISB_M2,
                    ProcessModel::random_walk(opts.isb_qprime, opts.default_interval_s),
                )),
            ),
            _ => (*constellation, None),
        };

        let clock = VariableTemplate::new(
            Parameter::ClockOffset(clock_system),
            VAR_CLK_M2,
            ProcessModel::white_noise(opts.clock_sigma_m),
        );

        // position, clock and troposphere, common to all equations
        let common = |observable: Observable, weight: f64| {
            let mut template = EquationTemplate::new(observable, *constellation, weight);
            for (variable, coef) in position.iter() {
                template = template.with_term(*variable, *coef);
            }
            template = template
                .with_term(clock, Coefficient::Forced(1.0))
                .with_term(tropo, Coefficient::WetMapping);
            match isb {
                Some(isb) => template.with_term(isb, Coefficient::Forced(1.0)),
                None => template,
            }
        };

        match cfg.iono_mode {
            IonosphereMode::IF12 => {
                templates.push(common(Observable::IonoFreeCode(dual), code_weight));
                if !cfg.code_only {
                    let phase = Observable::IonoFreePhase(dual);
                    templates.push(
                        common(phase, phase_weight)
                            .with_term(ambiguity(phase), Coefficient::Forced(1.0)),
                    );
                }
            },
            IonosphereMode::UC1 | IonosphereMode::UC12 => {
                let iono = VariableTemplate::new(
                    Parameter::SlantIono(dual.lhs),
                    VAR_IONO_M2,
                    ProcessModel::ionosphere(opts.iono_qprime, opts.default_interval_s),
                )
                .sv_indexed();

                let mut carriers = vec![(dual.lhs, 1.0)];
                if cfg.iono_mode == IonosphereMode::UC12 {
                    carriers.push((dual.rhs, dual.gamma()));
                }

                for (i, (carrier, iono_coef)) in carriers.into_iter().enumerate() {
                    let code = Observable::Code(carrier);
                    let mut template = common(code, code_weight)
                        .with_term(iono, Coefficient::Forced(iono_coef));

                    if i > 0 {
                        let ifb = VariableTemplate::new(
                            Parameter::InterFrequencyBias(*constellation, carrier),
                            VAR_IFB_M2,
                            ProcessModel::random_walk(opts.ifb_qprime, opts.default_interval_s),
                        );
                        template = template.with_term(ifb, Coefficient::Forced(1.0));
                    }

                    templates.push(template);

                    if !cfg.code_only {
                        let phase = Observable::Phase(carrier);
                        templates.push(
                            common(phase, phase_weight)
                                .with_term(iono, Coefficient::Forced(-iono_coef))
                                .with_term(ambiguity(phase), Coefficient::Forced(1.0)),
                        );
                    }
                }
            },
        }
    }

    templates
}
