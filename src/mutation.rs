use rayon::prelude::*;

use crate::bytecode::Instruction;
use crate::catalog::SignatureCatalog;
use crate::classunit::{ClassUnit, MethodBody};
use crate::config::Config;
use crate::context::{MethodKey, MutationContext, MutationIdentifier, MutationSite};
use crate::error::{Error, Result};
use crate::operator::{InstructionContext, LocalAllocator, MutationOperator, OperatorRegistry};
use crate::policy::MutationPolicy;
use crate::stack::{additional_stack, verify_replacement};

/// Outcome of traversing one method body.
#[derive(Debug)]
pub struct Traversal {
    /// Every candidate registered during the traversal, in order.
    pub sites: Vec<MutationSite>,

    /// The rewritten body, if the target identifier was applied.
    pub mutated: Option<MethodBody>,
}

/// Output of a single operator pass over a method body.
struct Pass {
    body: MethodBody,
    applied: bool,
}

/// Discovers mutation sites in class units and produces mutants.
pub struct MutationEngine {
    /// The policy used to filter classes and methods.
    mutation_policy: MutationPolicy,

    /// Enabled operators, in traversal order.
    registry: OperatorRegistry,

    /// Signatures used by call substitution, if a catalog was built.
    catalog: Option<SignatureCatalog>,

    threads: usize,
}

impl MutationEngine {
    /// Create a new `MutationEngine`, based on a configuration.
    ///
    /// The signature catalog named by the configuration is loaded if
    /// present; a missing or unreadable catalog leaves call substitution
    /// without candidates.
    pub fn new(config: &Config) -> Result<Self> {
        let catalog = config
            .catalog
            .path
            .as_ref()
            .map(SignatureCatalog::load_or_empty);

        Ok(Self {
            mutation_policy: MutationPolicy::from_config(config)?,
            registry: OperatorRegistry::new(&config.operators.enabled)?,
            catalog,
            threads: config.engine.threads.unwrap_or_else(num_cpus::get),
        })
    }

    /// Replace the signature catalog used for call substitution.
    pub fn with_catalog(self, catalog: SignatureCatalog) -> Self {
        Self {
            catalog: Some(catalog),
            ..self
        }
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &MutationPolicy {
        &self.mutation_policy
    }

    /// Traverse `method` once per enabled operator.
    ///
    /// Every candidate is registered; only the one equal to `target` is
    /// rewritten. A fatal error aborts the whole method body.
    pub fn traverse_method(
        &self,
        unit: &ClassUnit,
        method: &MethodBody,
        target: Option<&MutationIdentifier>,
    ) -> Result<Traversal> {
        let key = MethodKey::new(&unit.name, method);
        let mut context = MutationContext::new(key, unit.source_file.clone(), target.cloned());
        let instruction_context =
            InstructionContext::new(&unit.name, method, self.catalog.as_ref());

        let mut mutated = None;
        for operator in self.registry.operators() {
            let pass = self
                .run_pass(operator.as_ref(), method, &instruction_context, &mut context)
                .map_err(|e| {
                    log::error!("Aborting traversal of {}: {}", context.method(), e);
                    e
                })?;

            if pass.applied {
                mutated = Some(pass.body);
            }
        }

        Ok(Traversal {
            sites: context.into_sites(),
            mutated,
        })
    }

    fn run_pass(
        &self,
        operator: &dyn MutationOperator,
        method: &MethodBody,
        instruction_context: &InstructionContext,
        context: &mut MutationContext,
    ) -> Result<Pass> {
        let mut instructions = Vec::with_capacity(method.instructions.len());
        let mut locals = LocalAllocator::new(method.max_locals);
        let mut extra_stack = 0;
        let mut applied = false;

        context.set_line(None);

        for (index, instruction) in method.instructions.iter().enumerate() {
            if let Instruction::Line(line) = instruction {
                context.set_line(Some(*line));
            }

            let replacement = match operator.candidate(instruction, instruction_context) {
                Some(replacement) => replacement,
                None => {
                    instructions.push(instruction.clone());
                    continue;
                }
            };

            let id = context.register(
                operator.name(),
                operator.category(),
                index,
                replacement.description(),
            )?;

            if !context.should_mutate(&id) {
                instructions.push(instruction.clone());
                continue;
            }

            let original = std::slice::from_ref(replacement.original());
            let sequence = replacement.replacement(&mut locals)?;
            verify_replacement(operator.name(), original, &sequence)?;
            extra_stack = additional_stack(original, &sequence);

            log::debug!("Applying {}: {}", id, replacement.description());
            context.mark_applied(&id);
            applied = true;
            instructions.extend(sequence);
        }

        let body = MethodBody {
            max_stack: method
                .max_stack
                .checked_add(extra_stack)
                .ok_or(Error::FrameOverflow("max_stack"))?,
            max_locals: locals.next_free(),
            instructions,
            ..method.clone()
        };

        Ok(Pass { body, applied })
    }

    fn allowed_methods<'a>(&self, units: &'a [ClassUnit]) -> Vec<(&'a ClassUnit, &'a MethodBody)> {
        units
            .iter()
            .filter(|unit| self.mutation_policy.check_class(&unit.name))
            .flat_map(|unit| {
                unit.methods
                    .iter()
                    .filter(|method| self.mutation_policy.check_method(&method.name))
                    .map(move |method| (unit, method))
            })
            .collect()
    }

    /// Discover all mutation sites of the allowed methods in `units`.
    ///
    /// Methods are traversed in parallel; the result keeps unit and method
    /// order.
    pub fn discover_mutations(&self, units: &[ClassUnit]) -> Result<Vec<MutationSite>> {
        let methods = self.allowed_methods(units);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()?;

        let per_method: Vec<Vec<MutationSite>> = pool.install(|| {
            methods
                .par_iter()
                .map(|(unit, method)| {
                    self.traverse_method(unit, method, None)
                        .map(|traversal| traversal.sites)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mutations: Vec<MutationSite> = per_method.into_iter().flatten().collect();
        log::info!("Generated {} mutations", mutations.len());
        Ok(mutations)
    }

    /// Produce the mutant identified by `id`.
    pub fn mutate(&self, unit: &ClassUnit, id: &MutationIdentifier) -> Result<ClassUnit> {
        if unit.name != id.method.owner {
            return Err(Error::MethodNotFound(id.method.to_string()));
        }

        let descriptor = id.method.descriptor()?;
        let index = unit
            .find_method(&id.method.name, &descriptor)
            .ok_or_else(|| Error::MethodNotFound(id.method.to_string()))?;

        let traversal = self.traverse_method(unit, &unit.methods[index], Some(id))?;
        match traversal.mutated {
            Some(body) => Ok(unit.mutated_clone(index, body)),
            None => Err(Error::MutationNotFound(id.to_string())),
        }
    }

    /// Produce the `n`-th mutant discovered in `units`, together with its site.
    pub fn mutate_nth(&self, units: &[ClassUnit], n: usize) -> Result<(MutationSite, ClassUnit)> {
        let sites = self.discover_mutations(units)?;
        let site = sites
            .into_iter()
            .nth(n)
            .ok_or_else(|| Error::MutationNotFound(format!("#{n}")))?;

        let unit = units
            .iter()
            .find(|unit| unit.name == site.id.method.owner)
            .ok_or_else(|| Error::MethodNotFound(site.id.method.to_string()))?;

        let mutant = self.mutate(unit, &site.id)?;
        Ok((site, mutant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{ArithOp, InvokeKind, LocalType, MethodRef, NumericType};
    use crate::catalog::CatalogBuilder;
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use quickcheck::quickcheck;

    fn calculator() -> ClassUnit {
        ClassUnit::from_file("testdata/calculator/Calculator.json").unwrap()
    }

    fn engine(config: &str) -> MutationEngine {
        MutationEngine::new(&Config::parse_str(config).unwrap()).unwrap()
    }

    fn method<'a>(unit: &'a ClassUnit, name: &str, descriptor: &str) -> &'a MethodBody {
        let index = unit
            .find_method(name, &descriptor.parse().unwrap())
            .unwrap();
        &unit.methods[index]
    }

    /// Number of positions at which two instruction lists differ, counting
    /// a length difference as differences.
    fn differences(a: &[Instruction], b: &[Instruction]) -> usize {
        let common = a.iter().zip(b).filter(|(x, y)| x != y).count();
        common + a.len().abs_diff(b.len())
    }

    #[test]
    fn discover_mutations() -> Result<()> {
        let unit = calculator();
        let engine = MutationEngine::new(&Config::default())?;
        let sites = engine.discover_mutations(&[unit])?;
        assert!(!sites.is_empty());
        Ok(())
    }

    #[test]
    fn enable_only_some_operators() -> Result<()> {
        fn check_number_of_mutants(config: &str) -> usize {
            let unit = calculator();
            let config = Config::parse_file(format!("testdata/calculator/{config}")).unwrap();
            let engine = MutationEngine::new(&config).unwrap();
            engine.discover_mutations(&[unit]).unwrap().len()
        }

        // 7 arithmetic instructions, 2 branches
        assert_eq!(check_number_of_mutants("jvmut.toml"), 7 * 4 + 2 * 5 + 7 * 2);
        assert_eq!(check_number_of_mutants("jvmut_call.toml"), 2);
        Ok(())
    }

    #[test]
    fn discovery_is_deterministic() -> Result<()> {
        let units = vec![calculator()];
        let engine = engine("[engine]\nthreads = 4");
        let first = engine.discover_mutations(&units)?;
        let second = engine.discover_mutations(&units)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn sites_carry_source_location() -> Result<()> {
        let engine = engine("[operators]\nenabled = [\"uoi_reverse\"]");
        let sites = engine.discover_mutations(&[calculator()])?;
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].id.method.name, "count");
        assert_eq!(sites[0].location.line, Some(19));
        assert_eq!(
            sites[0].location.file.as_deref(),
            Some("com/example/Calculator.java")
        );
        Ok(())
    }

    #[test]
    fn policy_filters_methods() -> Result<()> {
        let engine = engine(
            r#"
            [operators]
            enabled = ["aor_isub"]
            [filter]
            allowed_methods = ["^total$"]
        "#,
        );
        let sites = engine.discover_mutations(&[calculator()])?;
        assert_eq!(sites.len(), 3);
        assert!(sites.iter().all(|site| site.id.method.name == "total"));
        Ok(())
    }

    #[test]
    fn traversal_without_target_changes_nothing() -> Result<()> {
        let unit = calculator();
        let engine = MutationEngine::new(&Config::default())?;
        for method in &unit.methods {
            let traversal = engine.traverse_method(&unit, method, None)?;
            assert!(traversal.mutated.is_none());
        }
        Ok(())
    }

    #[test]
    fn mutate_applies_exactly_one_site() -> Result<()> {
        let unit = calculator();
        let engine = MutationEngine::new(&Config::default())?;
        let sites = engine.discover_mutations(std::slice::from_ref(&unit))?;

        for site in &sites {
            let mutant = engine.mutate(&unit, &site.id)?;
            let changed: Vec<_> = unit
                .methods
                .iter()
                .zip(&mutant.methods)
                .filter(|(original, mutated)| original != mutated)
                .collect();
            assert_eq!(changed.len(), 1, "{}", site.id);

            let (original, mutated) = changed[0];
            assert_eq!(original.name, site.id.method.name);
            assert!(differences(&original.instructions, &mutated.instructions) > 0);
            let index = site.id.instruction_index;
            assert_eq!(&original.instructions[..index], &mutated.instructions[..index]);

            // Everything after the rewritten span is untouched
            let tail = original.instructions.len() - index - 1;
            assert!(mutated.instructions.len() > index + tail, "{}", site.id);
            assert_eq!(
                &original.instructions[index + 1..],
                &mutated.instructions[mutated.instructions.len() - tail..],
                "{}",
                site.id
            );
        }
        Ok(())
    }

    #[test]
    fn mutated_traversal_registers_the_same_sites() -> Result<()> {
        let unit = calculator();
        let engine = MutationEngine::new(&Config::default())?;
        let add = method(&unit, "add", "(II)I");

        let plain = engine.traverse_method(&unit, add, None)?;
        let target = plain.sites[3].id.clone();
        let mutated = engine.traverse_method(&unit, add, Some(&target))?;

        assert_eq!(plain.sites, mutated.sites);
        assert!(mutated.mutated.is_some());
        Ok(())
    }

    #[test]
    fn mutate_aor() -> Result<()> {
        let unit = calculator();
        let engine = engine("[operators]\nenabled = [\"aor_isub\"]");
        let id = MutationIdentifier::new(
            MethodKey::new(&unit.name, method(&unit, "add", "(II)I")),
            "aor_isub",
            3,
        );
        let mutant = engine.mutate(&unit, &id)?;
        assert_eq!(
            method(&mutant, "add", "(II)I").instructions[3],
            Instruction::Arith(ArithOp::Sub, NumericType::Int)
        );
        Ok(())
    }

    #[test]
    fn mutate_unknown_identifier() {
        let unit = calculator();
        let engine = MutationEngine::new(&Config::default()).unwrap();
        let key = MethodKey::new(&unit.name, method(&unit, "add", "(II)I"));

        let err = engine
            .mutate(&unit, &MutationIdentifier::new(key.clone(), "aor_isub", 1))
            .unwrap_err();
        assert!(matches!(err, Error::MutationNotFound(_)));

        let other = MethodKey {
            name: "missing".into(),
            ..key
        };
        let err = engine
            .mutate(&unit, &MutationIdentifier::new(other, "aor_isub", 3))
            .unwrap_err();
        assert!(matches!(err, Error::MethodNotFound(_)));
    }

    #[test]
    fn mutate_nth() -> Result<()> {
        let units = vec![calculator()];
        let engine = engine("[operators]\nenabled = [\"crcr_add_one\"]");
        let (site, mutant) = engine.mutate_nth(&units, 0)?;
        assert_eq!(site.id.operator, "crcr_add_one");
        assert_ne!(mutant, units[0]);

        assert!(matches!(
            engine.mutate_nth(&units, 1000),
            Err(Error::MutationNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn call_substitution_with_catalog() -> Result<()> {
        let unit = calculator();
        let mut builder = CatalogBuilder::new(1);
        builder.scan(&unit);
        let engine = engine("[operators]\nenabled = [\"call_replace_parameters\"]")
            .with_catalog(builder.build());

        let sites = engine.discover_mutations(std::slice::from_ref(&unit))?;
        assert_eq!(sites.len(), 1);

        let mutant = engine.mutate(&unit, &sites[0].id)?;
        let compute = method(&mutant, "compute", "(II)I");
        assert_eq!(compute.max_locals, 5);
        assert_eq!(
            &compute.instructions[3..],
            &[
                Instruction::Store(LocalType::Int, 3),
                Instruction::Store(LocalType::Int, 2),
                Instruction::IConst(0),
                Instruction::Store(LocalType::Int, 4),
                Instruction::Load(LocalType::Int, 2),
                Instruction::Load(LocalType::Int, 3),
                Instruction::Load(LocalType::Int, 4),
                Instruction::Invoke(MethodRef {
                    kind: InvokeKind::Static,
                    owner: "com/example/Calculator".into(),
                    name: "total".into(),
                    descriptor: "(III)I".parse()?,
                }),
                Instruction::ValueReturn(LocalType::Int),
            ]
        );
        Ok(())
    }

    #[test]
    fn operand_elimination_raises_max_stack() -> Result<()> {
        let unit = calculator();
        let engine = engine("[operators]\nenabled = [\"aod_first\"]");
        let scale = method(&unit, "scale", "(JI)J");
        let id = MutationIdentifier::new(MethodKey::new(&unit.name, scale), "aod_first", 4);

        let mutant = engine.mutate(&unit, &id)?;
        let mutated = method(&mutant, "scale", "(JI)J");
        assert_eq!(
            &mutated.instructions[4..7],
            &[Instruction::Dup2X2, Instruction::Pop2, Instruction::Pop2]
        );
        assert_eq!(mutated.max_stack, scale.max_stack + 2);
        Ok(())
    }

    #[test]
    fn fatal_error_aborts_method() {
        let unit = ClassUnit {
            name: "Broken".into(),
            source_file: None,
            methods: vec![MethodBody {
                name: "f".into(),
                descriptor: "(I)I".parse().unwrap(),
                is_static: true,
                max_stack: 1,
                max_locals: 1,
                instructions: vec![Instruction::Invoke(MethodRef {
                    kind: InvokeKind::Static,
                    owner: "Broken".into(),
                    name: "g".into(),
                    descriptor: "(I)I".parse().unwrap(),
                })],
            }],
        };

        // A record that pretends to take a void parameter
        let mut builder = CatalogBuilder::new(0);
        builder.add(crate::catalog::SignatureRecord::new(
            "Broken",
            "g",
            crate::descriptor::MethodDescriptor::new(
                vec![crate::descriptor::ValueType::Void],
                crate::descriptor::ValueType::Int,
            ),
            true,
        ));
        let engine = engine("[operators]\nenabled = [\"call\"]").with_catalog(builder.build());

        let sites = engine.discover_mutations(std::slice::from_ref(&unit)).unwrap();
        assert_eq!(sites.len(), 1);
        let err = engine.mutate(&unit, &sites[0].id).unwrap_err();
        assert!(err.is_fatal());
    }

    fn single_method_unit(method: MethodBody) -> ClassUnit {
        ClassUnit {
            name: "Limits".into(),
            source_file: None,
            methods: vec![method],
        }
    }

    #[test]
    fn call_rewrite_beyond_local_limit_is_fatal() -> Result<()> {
        let unit = single_method_unit(MethodBody {
            name: "m".into(),
            descriptor: "(J)I".parse()?,
            is_static: true,
            max_stack: 2,
            max_locals: u16::MAX,
            instructions: vec![
                Instruction::Load(LocalType::Long, 0),
                Instruction::Invoke(MethodRef {
                    kind: InvokeKind::Static,
                    owner: "Limits".into(),
                    name: "f".into(),
                    descriptor: "(J)I".parse()?,
                }),
            ],
        });

        let mut builder = CatalogBuilder::new(0);
        for descriptor in ["(J)I", "(D)I"] {
            builder.add(crate::catalog::SignatureRecord::new(
                "Limits",
                "f",
                descriptor.parse()?,
                true,
            ));
        }
        let engine = engine("[operators]\nenabled = [\"call_replace_parameters\"]")
            .with_catalog(builder.build());

        let sites = engine.discover_mutations(std::slice::from_ref(&unit))?;
        assert_eq!(sites.len(), 1);
        let err = engine.mutate(&unit, &sites[0].id).unwrap_err();
        assert!(matches!(err, Error::FrameOverflow("max_locals")));
        assert!(err.is_fatal());
        Ok(())
    }

    #[test]
    fn max_stack_beyond_limit_is_fatal() -> Result<()> {
        let unit = single_method_unit(MethodBody {
            name: "m".into(),
            descriptor: "(JJ)J".parse()?,
            is_static: true,
            max_stack: u16::MAX,
            max_locals: 4,
            instructions: vec![
                Instruction::Load(LocalType::Long, 0),
                Instruction::Load(LocalType::Long, 2),
                Instruction::Arith(ArithOp::Add, NumericType::Long),
                Instruction::ValueReturn(LocalType::Long),
            ],
        });
        let engine = engine("[operators]\nenabled = [\"aod_first\"]");

        let sites = engine.discover_mutations(std::slice::from_ref(&unit))?;
        assert_eq!(sites.len(), 1);
        let err = engine.mutate(&unit, &sites[0].id).unwrap_err();
        assert!(matches!(err, Error::FrameOverflow("max_stack")));
        Ok(())
    }

    fn palette(code: u8, value: i16) -> Instruction {
        match code % 8 {
            0 => Instruction::IConst(i32::from(value % 6)),
            1 => Instruction::SiPush(value),
            2 => Instruction::Load(LocalType::Int, (value as u16) % 4),
            3 => Instruction::Store(LocalType::Int, (value as u16) % 4),
            4 => Instruction::IInc((value as u16) % 4, value),
            5 => Instruction::Arith(ArithOp::ALL[(value as usize) % 5], NumericType::Int),
            6 => Instruction::Line(value as u32),
            _ => Instruction::Pop,
        }
    }

    quickcheck! {
        fn passes_without_target_reproduce_the_input(code: Vec<(u8, i16)>) -> bool {
            let method = MethodBody {
                name: "generated".into(),
                descriptor: "()V".parse().unwrap(),
                is_static: true,
                max_stack: 8,
                max_locals: 4,
                instructions: code.iter().map(|(c, v)| palette(*c, *v)).collect(),
            };
            let engine = MutationEngine::new(&Config::default()).unwrap();
            let instruction_context = InstructionContext::new("Generated", &method, None);
            let key = MethodKey::new("Generated", &method);
            let mut context = MutationContext::new(key, None, None);

            engine.registry().operators().iter().all(|operator| {
                let pass = engine
                    .run_pass(operator.as_ref(), &method, &instruction_context, &mut context)
                    .unwrap();
                !pass.applied && pass.body == method
            })
        }
    }
}
