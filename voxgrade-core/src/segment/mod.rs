//! Speech pieces: discovery, per-piece alignment, boundaries and splits.
//!
//! ## Pipeline
//!
//! ```text
//! find_search_windows -> crude_align + time_align (per piece)
//!                     -> finalize_piece_boundaries -> split_pieces
//! ```
//!
//! Piece bounds are VAD windows of the reference track; delays are samples.

use tracing::{debug, warn};

use crate::{
    align::{crude_align, split_align, time_align, CrudeTarget, SplitRequest, SplitResult},
    engine::{Piece, RatingContext},
    params::{MAX_PIECES, MIN_PIECE_LEN, MIN_SPLIT_SPEECH_LEN, SEARCHBUFFER},
};

const SB: i64 = SEARCHBUFFER as i64;

/// Open one piece per reference speech run of at least `MIN_PIECE_LEN`
/// windows whose crude-delayed image lands inside the degraded track.
///
/// Replaces `ctx.pieces`. Each piece's search window extends the run by
/// `SEARCHBUFFER` windows on both sides (clipped to the track).
pub fn find_search_windows(ctx: &mut RatingContext) {
    let ds = ctx.params.downsample as i64;
    let rec_n = ctx.rec.n_samples as i64;
    let del_deg_start = MIN_PIECE_LEN - ctx.crude_delay / ds;
    let del_deg_end = (rec_n - ctx.crude_delay) / ds - MIN_PIECE_LEN;

    let vad = ctx.src.vad();
    let len = vad.len() as i64;
    let mut pieces = Vec::new();
    let mut speech = false;
    let mut this_start = 0i64;
    let mut search_start = 0i64;

    for (count, &v) in vad.iter().enumerate() {
        let count = count as i64;
        if v > 0.0 && !speech {
            speech = true;
            this_start = count;
            search_start = (count - SB).max(0);
        }
        if (v <= 0.0 || count == len - 1) && speech {
            speech = false;
            if count - this_start >= MIN_PIECE_LEN
                && this_start < del_deg_end
                && count > del_deg_start
            {
                if pieces.len() >= MAX_PIECES {
                    warn!(max = MAX_PIECES, "piece limit reached, ignoring remaining speech");
                    break;
                }
                pieces.push(Piece {
                    search_start,
                    search_end: (count + SB).min(len - 1),
                    start: this_start,
                    end: count,
                    ..Piece::default()
                });
            }
        }
    }

    debug!(pieces = pieces.len(), "search windows identified");
    ctx.pieces = pieces;
}

/// Stretch pieces to cover the whole track and resolve overlaps.
///
/// The first piece starts at `SEARCHBUFFER`, the last ends `SEARCHBUFFER`
/// windows before the end, and neighbours meet halfway between the end of
/// one speech run and the start of the next. Edges are then pulled in so
/// the delayed image stays inside the degraded track, and neighbours whose
/// delayed images overlap are cut at the midpoint of the overlap.
pub fn finalize_piece_boundaries(ctx: &mut RatingContext) {
    let ds = ctx.params.downsample as i64;
    let rec_n = ctx.rec.n_samples as i64;
    let vad_len = ctx.src.vad_len() as i64;
    let pieces = &mut ctx.pieces;
    let Some(last) = pieces.len().checked_sub(1) else {
        return;
    };

    for i in 1..pieces.len() {
        let mid = (pieces[i].start + pieces[i - 1].end) / 2;
        pieces[i].start = mid;
        pieces[i - 1].end = mid;
    }
    pieces[0].start = SB;
    pieces[last].end = vad_len - SB;

    let first = &mut pieces[0];
    if first.start * ds + first.delay < SB * ds {
        first.start = SB + (ds - 1 - first.delay) / ds;
    }
    let tail = &mut pieces[last];
    if tail.end * ds + tail.delay > rec_n - SB * ds {
        tail.end = (rec_n - tail.delay) / ds - SB;
    }

    for i in 1..pieces.len() {
        let this_start = pieces[i].start * ds + pieces[i].delay;
        let last_end = pieces[i - 1].end * ds + pieces[i - 1].delay;
        if this_start < last_end {
            let mid = (this_start + last_end) / 2;
            pieces[i].start = (ds - 1 + mid - pieces[i].delay) / ds;
            pieces[i - 1].end = (mid - pieces[i - 1].delay) / ds;
        }
    }
}

/// Split pieces at detected delay jumps until no piece splits further or
/// `MAX_PIECES` is reached.
///
/// A split piece is re-examined in place; its second half is inserted right
/// after it and examined next.
pub fn split_pieces(ctx: &mut RatingContext) {
    let mut idx = 0;
    while idx < ctx.pieces.len() && ctx.pieces.len() < MAX_PIECES {
        let piece = ctx.pieces[idx];
        let (speech_start, speech_end) = speech_interior(ctx.src.vad(), &piece);

        if speech_end - speech_start >= MIN_SPLIT_SPEECH_LEN {
            let req = SplitRequest::for_piece(&piece, speech_start, speech_end);
            if let Some(found) = split_align(ctx, &req) {
                let (first, second) = split_at(ctx, &piece, &found);
                ctx.pieces[idx] = first;
                ctx.pieces.insert(idx + 1, second);
                debug!(piece = idx, breakpoint = found.breakpoint, "piece split");
                continue;
            }
        }
        idx += 1;
    }
}

/// Trim leading and trailing non-speech windows off a piece. The end is
/// exclusive.
fn speech_interior(vad: &[f32], piece: &Piece) -> (i64, i64) {
    let active = |i: i64| usize::try_from(i).ok().and_then(|i| vad.get(i)).is_some_and(|&v| v > 0.0);

    let mut speech_start = piece.start;
    while speech_start < piece.end && !active(speech_start) {
        speech_start += 1;
    }
    let mut speech_end = piece.end;
    while speech_end > piece.start && !active(speech_end) {
        speech_end -= 1;
    }
    (speech_start, speech_end + 1)
}

fn split_at(ctx: &RatingContext, piece: &Piece, found: &SplitResult) -> (Piece, Piece) {
    let ds = ctx.params.downsample as i64;
    let rec_n = ctx.rec.n_samples as i64;
    let bp = found.breakpoint;

    let mut first = Piece {
        delay_est: found.est1,
        delay: found.delay1,
        confidence: found.conf1,
        start: piece.start,
        end: bp,
        ..*piece
    };
    let mut second = Piece {
        delay_est: found.est2,
        delay: found.delay2,
        confidence: found.conf2,
        start: bp,
        end: piece.end,
        ..*piece
    };

    // a forward jump repeats audio; let both halves cover it
    if found.delay2 >= found.delay1 {
        let half = (found.delay2 - found.delay1) / (2 * ds);
        first.end = bp + half;
        second.start = bp - half;
    }

    if (first.start - SB) * ds + found.delay1 < 0 {
        first.start = SB + (ds - 1 - found.delay1) / ds;
    }
    if second.end * ds + found.delay2 > rec_n - SB * ds {
        second.end = (rec_n - found.delay2) / ds - SB;
    }
    (first, second)
}

/// Discover pieces, align each one and split where the delay jumps.
pub fn locate_and_align_pieces(ctx: &mut RatingContext) {
    find_search_windows(ctx);
    for idx in 0..ctx.pieces.len() {
        crude_align(ctx, CrudeTarget::Piece(idx));
        time_align(ctx, idx);
    }
    finalize_piece_boundaries(ctx);
    split_pieces(ctx);
}
