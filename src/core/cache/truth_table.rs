use crate::core::cache::eligibility::CacheEligibilityChecker;
use crate::core::components::registry::CompiledChip;
use crate::core::errors::SimError;
use crate::core::execution::config::{ConcurrencyMode, SimulationConfig};
use crate::core::execution::evaluator::Propagation;
use crate::core::execution::instance::ChipInstance;
use crate::core::input::bridge::InputSnapshot;
use crate::core::types::ChipId;
use crate::core::values::{width_mask, PinValue};
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Rows enumerated per instance in a parallel build
const ROWS_PER_TASK: usize = 256;

/// Pack pin values into a table index; the first pin lands in the most
/// significant bits
pub fn pack_inputs(widths: &[u8], inputs: &[PinValue]) -> usize {
    widths.iter().enumerate().fold(0usize, |index, (pin, width)| {
        let bits = inputs.get(pin).map_or(0, PinValue::bits) & width_mask(*width);
        (index << *width) | bits as usize
    })
}

/// Split a table index back into per-pin values, first pin most significant
pub fn unpack_inputs(widths: &[u8], index: usize) -> Vec<u64> {
    let mut remaining = index as u64;
    let mut values = vec![0u64; widths.len()];
    for (pin, width) in widths.iter().enumerate().rev() {
        values[pin] = remaining & width_mask(*width);
        remaining = if *width >= 64 { 0 } else { remaining >> *width };
    }
    values
}

/// Precomputed outputs of one chip for every input combination
#[derive(Debug, Clone)]
pub struct TruthTable {
    content_hash: u64,
    input_widths: Vec<u8>,
    output_widths: Vec<u8>,
    /// Whether each output is driven under direct evaluation
    driven_outputs: Vec<bool>,
    /// `rows × outputs` packed values, row-major
    rows: Vec<u64>,
}

impl TruthTable {
    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    /// Number of input combinations
    pub fn row_count(&self) -> usize {
        1usize << self.input_widths.iter().map(|w| *w as u32).sum::<u32>()
    }

    /// Packed outputs for one input combination
    pub fn row(&self, index: usize) -> &[u64] {
        let width = self.output_widths.len();
        let start = index * width;
        self.rows.get(start..start + width).unwrap_or(&[])
    }

    /// Outputs for the given input pin values
    pub fn lookup(&self, inputs: &[PinValue]) -> CachedOutputs<'_> {
        CachedOutputs {
            bits: self.row(pack_inputs(&self.input_widths, inputs)),
            driven: &self.driven_outputs,
        }
    }

    /// Table memory in bytes
    pub fn size_bytes(&self) -> usize {
        self.rows.len() * std::mem::size_of::<u64>()
    }
}

/// One row of a truth table, ready to be written to output pins
#[derive(Debug, Clone, Copy)]
pub struct CachedOutputs<'a> {
    bits: &'a [u64],
    driven: &'a [bool],
}

impl CachedOutputs<'_> {
    pub fn bits(&self) -> &[u64] {
        self.bits
    }

    /// Write the row to output pins. Returns whether any pin changed.
    pub fn write_to(&self, outputs: &mut [PinValue]) -> bool {
        let mut changed = false;
        for ((out, bits), driven) in outputs.iter_mut().zip(self.bits).zip(self.driven) {
            let next = if *driven {
                PinValue::driven(out.width(), *bits)
            } else {
                PinValue::undriven(out.width())
            };
            changed |= out.assign(&next);
        }
        changed
    }
}

/// Counters for cache activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub builds: u64,
    pub stale_discards: u64,
}

/// Truth tables for cache-enabled chips, keyed by chip identity
///
/// Each entry carries the content hash it was built from; a lookup against a
/// chip whose hash differs discards the entry and builds a fresh one. Only the
/// simulation thread touches the cache.
#[derive(Debug, Default)]
pub struct TruthTableCache {
    tables: HashMap<ChipId, TruthTable>,
    stats: CacheStats,
}

impl TruthTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the outputs for `inputs`, building the chip's table on first use
    pub fn get_or_build(
        &mut self,
        chip: &Arc<CompiledChip>,
        inputs: &[PinValue],
        config: &SimulationConfig,
    ) -> Result<CachedOutputs<'_>, SimError> {
        let id = chip.id();

        let stale = matches!(self.tables.get(id), Some(table) if table.content_hash != chip.content_hash());
        if stale {
            debug!("{}: discarding stale truth table", id);
            self.tables.remove(id);
            self.stats.stale_discards += 1;
        }

        if self.tables.contains_key(id) {
            self.stats.hits += 1;
        } else {
            let table = Self::build_table(chip, config)?;
            self.stats.builds += 1;
            self.tables.insert(id.clone(), table);
        }

        self.tables
            .get(id)
            .map(|table| table.lookup(inputs))
            .ok_or_else(|| SimError::UnknownChip(id.clone()))
    }

    /// Enumerate every input combination of a chip by direct evaluation
    pub fn build_table(chip: &Arc<CompiledChip>, config: &SimulationConfig) -> Result<TruthTable, SimError> {
        let definition = chip.definition();
        let eligibility = CacheEligibilityChecker::evaluate(definition);
        if let Some(reason) = eligibility.reason {
            warn!("{}: refusing to build truth table: {}", chip.id(), reason);
            return Err(SimError::CacheBudgetExceeded {
                chip: chip.id().clone(),
                reason,
            });
        }
        if chip.is_stateful() {
            return Err(SimError::Uncacheable {
                chip: chip.id().clone(),
                reason: "outputs depend on internal state".to_string(),
            });
        }

        let input_widths: Vec<u8> = definition.input_pins.iter().map(|p| p.bit_width).collect();
        let output_widths: Vec<u8> = definition.output_pins.iter().map(|p| p.bit_width).collect();
        let total_bits = CacheEligibilityChecker::total_input_width(definition);
        let row_count = 1usize << total_bits;
        let outputs = output_widths.len();

        // Row 0 fixes which outputs are driven at all
        let mut probe = ChipInstance::from_compiled(Arc::clone(chip));
        evaluate_row(chip, &mut probe, &input_widths, 0, config)?;
        let driven_outputs: Vec<bool> = probe.outputs().iter().map(PinValue::is_driven).collect();

        let mut rows = vec![0u64; row_count * outputs];
        if outputs > 0 {
            match config.concurrency_mode {
                ConcurrencyMode::Sequential => {
                    fill_rows(chip, &mut rows, 0, &input_widths, outputs, config)?;
                }
                ConcurrencyMode::Rayon => {
                    fill_rows_parallel(chip, &mut rows, &input_widths, outputs, config)?;
                }
            }
        }

        let table = TruthTable {
            content_hash: chip.content_hash(),
            input_widths,
            output_widths,
            driven_outputs,
            rows,
        };
        debug!(
            "{}: built truth table with {} rows ({} bytes)",
            chip.id(),
            row_count,
            table.size_bytes()
        );
        Ok(table)
    }

    pub fn get(&self, id: &ChipId) -> Option<&TruthTable> {
        self.tables.get(id)
    }

    pub fn contains(&self, id: &ChipId) -> bool {
        self.tables.contains_key(id)
    }

    /// Drop one chip's table. Returns whether a table was present.
    pub fn invalidate(&mut self, id: &ChipId) -> bool {
        self.tables.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

/// Drive row `index` onto the instance's inputs and settle it; outputs are
/// left on the instance
fn evaluate_row(
    chip: &Arc<CompiledChip>,
    instance: &mut ChipInstance,
    input_widths: &[u8],
    index: usize,
    config: &SimulationConfig,
) -> Result<(), SimError> {
    for (pin, bits) in unpack_inputs(input_widths, index).into_iter().enumerate() {
        instance.set_input(pin, bits)?;
    }

    let no_input = InputSnapshot::empty();
    let mut propagation = Propagation::new(config, None, &no_input, true);
    let settled = propagation.evaluate(instance)?;
    if !settled.stable || propagation.nested_unstable {
        return Err(SimError::Uncacheable {
            chip: chip.id().clone(),
            reason: format!("row {} did not settle", index),
        });
    }
    Ok(())
}

/// Fill `rows` (which starts at row `first_row`) on one instance
fn fill_rows(
    chip: &Arc<CompiledChip>,
    rows: &mut [u64],
    first_row: usize,
    input_widths: &[u8],
    outputs: usize,
    config: &SimulationConfig,
) -> Result<(), SimError> {
    let mut instance = ChipInstance::from_compiled(Arc::clone(chip));
    for (offset, row) in rows.chunks_mut(outputs).enumerate() {
        evaluate_row(chip, &mut instance, input_widths, first_row + offset, config)?;
        for (slot, out) in row.iter_mut().zip(instance.outputs()) {
            *slot = out.bits();
        }
    }
    Ok(())
}

fn fill_rows_parallel(
    chip: &Arc<CompiledChip>,
    rows: &mut [u64],
    input_widths: &[u8],
    outputs: usize,
    config: &SimulationConfig,
) -> Result<(), SimError> {
    let fill = |rows: &mut [u64]| {
        rows.par_chunks_mut(outputs * ROWS_PER_TASK)
            .enumerate()
            .try_for_each(|(task, chunk)| {
                fill_rows(chip, chunk, task * ROWS_PER_TASK, input_widths, outputs, config)
            })
    };

    match config.thread_pool_size {
        Some(size) => match rayon::ThreadPoolBuilder::new().num_threads(size).build() {
            Ok(pool) => pool.install(|| fill(rows)),
            Err(err) => {
                warn!("Falling back to the global pool: {}", err);
                fill(rows)
            }
        },
        None => fill(rows),
    }
}
