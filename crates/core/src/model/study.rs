/// Answer tally for the running study session.
///
/// Fields are private so `correct + incorrect == total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StudyCounters {
    correct: u32,
    incorrect: u32,
    total: u32,
}

impl StudyCounters {
    pub fn record(&mut self, is_correct: bool) {
        if is_correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
        self.total += 1;
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Correct answers in percent of all answers, 0 when nothing was answered.
    #[must_use]
    pub fn accuracy_percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.correct) / f64::from(self.total) * 100.0
    }
}

/// Read-only digest of a study session for the view layer.
#[derive(Debug, Clone, PartialEq)]
pub struct StudySummary {
    pub counters: StudyCounters,
    pub accuracy_percentage: f64,
    pub cards_in_deck: usize,
    pub cards_answered: usize,
    pub completion_percentage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_total_in_sync() {
        let mut counters = StudyCounters::default();
        for is_correct in [true, false, true, true] {
            counters.record(is_correct);
            assert_eq!(counters.correct() + counters.incorrect(), counters.total());
        }
        assert_eq!(counters.correct(), 3);
        assert!((counters.accuracy_percentage() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn empty_counters_report_zero_accuracy() {
        assert!(StudyCounters::default().accuracy_percentage().abs() < f64::EPSILON);
    }
}
